#![allow(dead_code)]

use std::sync::Arc;

use algoref::api::{ApiClient, ApiConfig, Catalog};
use algoref::cache::RequestCache;
use algoref::mutation::MutationOrchestrator;
use algoref::session::{
    AuthFlows, CredentialStore, DEFAULT_LOGIN_PATH, MemoryCredentialStore, SessionGuard,
    StoredCredentials,
};
use httpmock::MockServer;
use serde_json::{Value, json};

pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";

/// Components wired against a mock backend, sharing one in-memory store.
pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub cache: RequestCache,
    pub client: ApiClient,
    pub guard: SessionGuard,
    pub catalog: Catalog,
    pub auth: AuthFlows,
    pub mutations: MutationOrchestrator,
}

pub async fn harness(server: &MockServer, credentials: Option<StoredCredentials>) -> Harness {
    let store = Arc::new(match credentials {
        Some(credentials) => MemoryCredentialStore::with_credentials(credentials),
        None => MemoryCredentialStore::new(),
    });
    let dyn_store: Arc<dyn CredentialStore> = store.clone();
    let config = ApiConfig {
        base_url: server.url("/api/v1"),
        ..ApiConfig::default()
    };
    let client = ApiClient::new(&config, Arc::clone(&dyn_store)).expect("api client");
    let cache = RequestCache::default();
    let guard = SessionGuard::new(client.clone(), Arc::clone(&dyn_store), DEFAULT_LOGIN_PATH).await;
    let catalog = Catalog::new(client.clone(), cache.clone()).with_guard(guard.clone());
    let auth = AuthFlows::new(client.clone(), dyn_store, guard.clone(), cache.clone());
    let mutations = MutationOrchestrator::new(client.clone(), cache.clone(), guard.clone());

    Harness {
        store,
        cache,
        client,
        guard,
        catalog,
        auth,
        mutations,
    }
}

pub fn signed_in() -> Option<StoredCredentials> {
    Some(StoredCredentials::new(ACCESS_TOKEN, REFRESH_TOKEN))
}

pub fn bearer() -> String {
    format!("Bearer {ACCESS_TOKEN}")
}

pub fn category() -> Value {
    json!({"id": 1, "name": "Searching", "slug": "searching"})
}

pub fn difficulty() -> Value {
    json!({"id": 2, "name": "Medium", "color": "#f59e0b"})
}

pub fn summary(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Algorithm {id}"),
        "slug": slug,
        "category": category(),
        "difficulty": difficulty(),
        "concept_summary": "Repeatedly halve the search interval.",
        "time_complexity": "O(log n)",
        "space_complexity": "O(1)",
        "view_count": 10,
    })
}

pub fn algorithm(id: i64, slug: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Algorithm {id}"),
        "slug": slug,
        "category": category(),
        "difficulty": difficulty(),
        "concept_summary": "Repeatedly halve the search interval.",
        "time_complexity": "O(log n)",
        "space_complexity": "O(1)",
        "code_templates": [],
        "is_published": true,
        "view_count": 10,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-02T00:00:00Z",
    })
}

pub fn page(items: &[(i64, &str)], page: u32) -> Value {
    let items: Vec<Value> = items.iter().map(|(id, slug)| summary(*id, slug)).collect();
    let total = items.len();
    json!({"items": items, "total": total, "page": page, "size": 12, "pages": 1})
}

pub fn code_template(id: i64, algorithm_id: i64) -> Value {
    json!({
        "id": id,
        "algorithm_id": algorithm_id,
        "language": {
            "id": 1,
            "name": "Python",
            "slug": "python",
            "extension": "py",
            "prism_key": "python",
        },
        "code": "def search(xs, x): ...",
    })
}

pub fn current_user() -> Value {
    json!({"id": 1, "email": "admin@test.com", "role": "admin"})
}

pub fn tokens() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "refresh_token": REFRESH_TOKEN,
        "token_type": "bearer",
        "expires_in": 1800,
    })
}
