//! Cache key and tag definitions.
//!
//! `QueryKey` identifies a request by endpoint and parameters; `Tag` labels
//! the entities a cached response depends on so that writes can find it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Canonical identifier of a read request.
///
/// Parameters are serialized with object keys sorted at every depth and
/// `null` members dropped, so logically identical requests produce the same
/// key regardless of how the caller assembled them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    endpoint: String,
    canonical: String,
}

impl QueryKey {
    /// Key for a request without parameters.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let canonical = format!("{endpoint}()");
        Self {
            endpoint,
            canonical,
        }
    }

    /// Key for a request whose parameters are any serializable value.
    pub fn with_params<P: Serialize + ?Sized>(
        endpoint: impl Into<String>,
        params: &P,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(params)?;
        Ok(Self::from_value(endpoint, &value))
    }

    /// Key for a request whose parameters are already a JSON value.
    pub fn from_value(endpoint: impl Into<String>, params: &Value) -> Self {
        let endpoint = endpoint.into();
        let mut canonical = String::with_capacity(endpoint.len() + 32);
        canonical.push_str(&endpoint);
        canonical.push('(');
        match canonicalize(params) {
            Some(Value::Object(map)) if map.is_empty() => {}
            Some(value) => write_canonical(&value, &mut canonical),
            None => {}
        }
        canonical.push(')');
        Self {
            endpoint,
            canonical,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Drop `null` members recursively. Returns `None` for a top-level `null`.
fn canonicalize(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| canonicalize(item).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| canonicalize(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

// serde_json's map ordering depends on the `preserve_order` feature, which any
// crate in the build graph may switch on. Sort explicitly instead.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (idx, (key, member)) in sorted.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Collection a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Algorithm,
    Category,
    Language,
    User,
}

impl TagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::Algorithm => "Algorithm",
            TagKind::Category => "Category",
            TagKind::Language => "Language",
            TagKind::User => "User",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagId {
    /// The collection as a whole.
    List,
    /// The signed-in user.
    Current,
    Entity(i64),
}

/// Opaque label attached to cache entries to drive invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: TagId,
}

impl Tag {
    pub const fn list(kind: TagKind) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    pub const fn entity(kind: TagKind, id: i64) -> Self {
        Self {
            kind,
            id: TagId::Entity(id),
        }
    }

    pub const fn current(kind: TagKind) -> Self {
        Self {
            kind,
            id: TagId::Current,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            TagId::List => write!(f, "{}:LIST", self.kind.as_str()),
            TagId::Current => write!(f, "{}:CURRENT", self.kind.as_str()),
            TagId::Entity(id) => write!(f, "{}:{id}", self.kind.as_str()),
        }
    }
}

pub type TagSet = HashSet<Tag>;

/// Tags for a collection read: the `LIST` tag plus one per member.
pub fn collection_tags<I>(kind: TagKind, ids: I) -> TagSet
where
    I: IntoIterator<Item = i64>,
{
    let mut tags: TagSet = ids.into_iter().map(|id| Tag::entity(kind, id)).collect();
    tags.insert(Tag::list(kind));
    tags
}
