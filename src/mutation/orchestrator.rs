use algoref_api_types::{
    Algorithm, AlgorithmCreate, AlgorithmUpdate, CodeTemplate, CodeTemplateCreate, Id,
};
use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use super::validate::{validate_create, validate_template, validate_update};
use crate::api::{ApiClient, ApiError, ApiPath, FieldError, algorithm_detail_key};
use crate::cache::{RequestCache, Tag, TagKind, TagSet};
use crate::session::SessionGuard;

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save algorithm";

const METRIC_MUTATION: &str = "algoref_mutation_total";

/// A failed admin write, with the message to show the user.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MutationError {
    pub message: String,
    #[source]
    pub source: ApiError,
}

impl MutationError {
    fn new(source: ApiError) -> Self {
        Self {
            message: source.user_message(SAVE_FAILED_MESSAGE),
            source,
        }
    }

    pub fn fields(&self) -> &[FieldError] {
        self.source.fields()
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.source, ApiError::Validation { .. })
    }

    pub fn is_auth(&self) -> bool {
        self.source.is_auth()
    }
}

/// Admin writes that keep the request cache consistent.
///
/// Each call settles once; nothing is retried. Tags are invalidated only after
/// the backend accepted the write.
#[derive(Clone)]
pub struct MutationOrchestrator {
    client: ApiClient,
    cache: RequestCache,
    guard: SessionGuard,
}

impl MutationOrchestrator {
    pub fn new(client: ApiClient, cache: RequestCache, guard: SessionGuard) -> Self {
        Self {
            client,
            cache,
            guard,
        }
    }

    /// Create an algorithm and seed its detail entry from the response.
    pub async fn create(&self, input: &AlgorithmCreate) -> Result<Algorithm, MutationError> {
        validate_create(input).map_err(|err| self.rejected("create", err))?;

        let created: Algorithm = match self.client.post("admin/algorithms", input).await {
            Ok(created) => created,
            Err(err) => return Err(self.failed("create", err).await),
        };

        let report = self
            .cache
            .invalidate(&TagSet::from([Tag::list(TagKind::Algorithm)]));
        match serde_json::to_value(&created) {
            Ok(payload) => {
                self.cache.prime(
                    algorithm_detail_key(&created.slug),
                    payload,
                    TagSet::from([Tag::entity(TagKind::Algorithm, created.id)]),
                );
            }
            Err(err) => warn!(error = %err, "Could not cache created algorithm"),
        }

        counter!(METRIC_MUTATION, "op" => "create", "outcome" => "ok").increment(1);
        info!(
            algorithm_id = created.id,
            slug = %created.slug,
            invalidation_id = %report.id,
            "Algorithm created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: Id, patch: &AlgorithmUpdate) -> Result<Algorithm, MutationError> {
        validate_update(patch).map_err(|err| self.rejected("update", err))?;

        let path = admin_algorithm_path(id);
        let updated: Algorithm = match self.client.put(path, patch).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.failed("update", err).await),
        };

        let report = self.cache.invalidate(&TagSet::from([
            Tag::list(TagKind::Algorithm),
            Tag::entity(TagKind::Algorithm, id),
        ]));
        counter!(METRIC_MUTATION, "op" => "update", "outcome" => "ok").increment(1);
        info!(algorithm_id = id, invalidation_id = %report.id, "Algorithm updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Id) -> Result<(), MutationError> {
        if let Err(err) = self.client.delete(admin_algorithm_path(id)).await {
            return Err(self.failed("delete", err).await);
        }

        let report = self.cache.invalidate(&TagSet::from([
            Tag::list(TagKind::Algorithm),
            Tag::entity(TagKind::Algorithm, id),
        ]));
        counter!(METRIC_MUTATION, "op" => "delete", "outcome" => "ok").increment(1);
        info!(algorithm_id = id, invalidation_id = %report.id, "Algorithm deleted");
        Ok(())
    }

    pub async fn add_code_template(
        &self,
        algorithm_id: Id,
        template: &CodeTemplateCreate,
    ) -> Result<CodeTemplate, MutationError> {
        validate_template(template).map_err(|err| self.rejected("add_code_template", err))?;

        let path = admin_algorithm_path(algorithm_id).segment("templates");
        let created: CodeTemplate = match self.client.post(path, template).await {
            Ok(created) => created,
            Err(err) => return Err(self.failed("add_code_template", err).await),
        };

        let report = self
            .cache
            .invalidate(&TagSet::from([Tag::entity(TagKind::Algorithm, algorithm_id)]));
        counter!(METRIC_MUTATION, "op" => "add_code_template", "outcome" => "ok").increment(1);
        info!(
            algorithm_id,
            template_id = created.id,
            invalidation_id = %report.id,
            "Code template added"
        );
        Ok(created)
    }

    fn rejected(&self, op: &'static str, err: ApiError) -> MutationError {
        counter!(METRIC_MUTATION, "op" => op, "outcome" => "invalid").increment(1);
        MutationError::new(err)
    }

    async fn failed(&self, op: &'static str, err: ApiError) -> MutationError {
        counter!(METRIC_MUTATION, "op" => op, "outcome" => "error").increment(1);
        if self.guard.escalate(&err).await {
            warn!(op, "Admin write rejected; session ended");
        } else {
            warn!(op, error = %err, "Admin write failed");
        }
        MutationError::new(err)
    }
}

fn admin_algorithm_path(id: Id) -> ApiPath {
    ApiPath::from("admin/algorithms").segment(id.to_string())
}
