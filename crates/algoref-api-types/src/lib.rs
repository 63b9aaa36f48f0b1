//! Wire types shared by the AlgoRef catalog API and its clients.
//!
//! Field names follow the backend JSON exactly. Optional request fields are
//! skipped when absent so that partial updates never send `null`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyLevel {
    pub id: Id,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammingLanguage {
    pub id: Id,
    pub name: String,
    pub slug: String,
    pub extension: String,
    /// Syntax highlighter key.
    pub prism_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTemplate {
    pub id: Id,
    pub algorithm_id: Id,
    pub language: ProgrammingLanguage,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFormula {
    pub name: String,
    pub formula: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConditions {
    #[serde(default)]
    pub when_to_use: Vec<String>,
    #[serde(default)]
    pub when_not_to_use: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub leetcode_examples: Vec<String>,
}

/// Full algorithm entity as returned by the detail and admin endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub category: Category,
    pub difficulty: DifficultyLevel,
    pub concept_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_formulas: Option<Vec<CoreFormula>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_conditions: Option<ApplicationConditions>,
    pub time_complexity: String,
    pub space_complexity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_types: Option<Vec<ProblemType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_mistakes: Option<String>,
    #[serde(default)]
    pub code_templates: Vec<CodeTemplate>,
    pub is_published: bool,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Condensed algorithm used by list pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub id: Id,
    pub title: String,
    pub slug: String,
    pub category: Category,
    pub difficulty: DifficultyLevel,
    pub concept_summary: String,
    pub time_complexity: String,
    pub space_complexity: String,
    pub view_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedAlgorithms {
    pub items: Vec<AlgorithmSummary>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmCreate {
    pub title: String,
    pub category_id: Id,
    pub difficulty_id: Id,
    pub concept_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_formulas: Option<Vec<CoreFormula>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_conditions: Option<ApplicationConditions>,
    pub time_complexity: String,
    pub space_complexity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_types: Option<Vec<ProblemType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_mistakes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_formulas: Option<Vec<CoreFormula>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_conditions: Option<ApplicationConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_types: Option<Vec<ProblemType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_mistakes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTemplateCreate {
    pub language_id: Id,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Id,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorItem {
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationErrorItem {
    /// Field name the error points at, skipping the `body`/`query` prefix.
    pub fn field(&self) -> String {
        self.loc
            .iter()
            .filter_map(|part| match part {
                serde_json::Value::String(s) if s != "body" && s != "query" => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// `detail` is a plain message for most errors and a list for request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(Vec<ValidationErrorItem>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: ErrorDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Title,
    ViewCount,
    #[default]
    CreatedAt,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::ViewCount => "view_count",
            SortBy::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}
