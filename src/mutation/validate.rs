//! Client-side checks run before any admin write reaches the network.

use algoref_api_types::{
    AlgorithmCreate, AlgorithmUpdate, CodeTemplateCreate, CoreFormula, ProblemType,
};

use crate::api::{ApiError, FieldError};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 200;
pub const SUMMARY_MIN_CHARS: usize = 20;
pub const COMPLEXITY_MAX_CHARS: usize = 50;

#[derive(Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn title(&mut self, title: &str) {
        let len = title.trim().chars().count();
        if len < TITLE_MIN_CHARS {
            self.push("title", "Title must be at least 3 characters");
        } else if len > TITLE_MAX_CHARS {
            self.push("title", "Title must be at most 200 characters");
        }
    }

    fn summary(&mut self, summary: &str) {
        if summary.trim().chars().count() < SUMMARY_MIN_CHARS {
            self.push(
                "concept_summary",
                "Concept summary must be at least 20 characters",
            );
        }
    }

    fn complexity(&mut self, field: &'static str, label: &str, value: &str) {
        let len = value.trim().chars().count();
        if len == 0 {
            self.push(field, format!("{label} is required"));
        } else if len > COMPLEXITY_MAX_CHARS {
            self.push(field, format!("{label} must be at most 50 characters"));
        }
    }

    fn reference(&mut self, field: &'static str, label: &str, id: i64) {
        if id <= 0 {
            self.push(field, format!("{label} is required"));
        }
    }

    fn formulas(&mut self, formulas: &[CoreFormula]) {
        for (idx, formula) in formulas.iter().enumerate() {
            if formula.name.trim().is_empty() {
                self.push(format!("core_formulas.{idx}.name"), "Formula name is required");
            }
            if formula.formula.trim().is_empty() {
                self.push(format!("core_formulas.{idx}.formula"), "Formula is required");
            }
            if formula.description.trim().is_empty() {
                self.push(
                    format!("core_formulas.{idx}.description"),
                    "Description is required",
                );
            }
        }
    }

    fn problem_types(&mut self, problem_types: &[ProblemType]) {
        for (idx, problem) in problem_types.iter().enumerate() {
            if problem.kind.trim().is_empty() {
                self.push(format!("problem_types.{idx}.type"), "Problem type is required");
            }
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.0))
        }
    }
}

pub fn validate_create(input: &AlgorithmCreate) -> Result<(), ApiError> {
    let mut violations = Violations::default();
    violations.title(&input.title);
    violations.reference("category_id", "Category", input.category_id);
    violations.reference("difficulty_id", "Difficulty", input.difficulty_id);
    violations.summary(&input.concept_summary);
    violations.complexity("time_complexity", "Time complexity", &input.time_complexity);
    violations.complexity("space_complexity", "Space complexity", &input.space_complexity);
    if let Some(formulas) = &input.core_formulas {
        violations.formulas(formulas);
    }
    if let Some(problem_types) = &input.problem_types {
        violations.problem_types(problem_types);
    }
    violations.finish()
}

/// Same rules as create, applied only to the fields present in the patch.
pub fn validate_update(patch: &AlgorithmUpdate) -> Result<(), ApiError> {
    let mut violations = Violations::default();
    if let Some(title) = &patch.title {
        violations.title(title);
    }
    if let Some(id) = patch.category_id {
        violations.reference("category_id", "Category", id);
    }
    if let Some(id) = patch.difficulty_id {
        violations.reference("difficulty_id", "Difficulty", id);
    }
    if let Some(summary) = &patch.concept_summary {
        violations.summary(summary);
    }
    if let Some(value) = &patch.time_complexity {
        violations.complexity("time_complexity", "Time complexity", value);
    }
    if let Some(value) = &patch.space_complexity {
        violations.complexity("space_complexity", "Space complexity", value);
    }
    if let Some(formulas) = &patch.core_formulas {
        violations.formulas(formulas);
    }
    if let Some(problem_types) = &patch.problem_types {
        violations.problem_types(problem_types);
    }
    violations.finish()
}

pub fn validate_template(template: &CodeTemplateCreate) -> Result<(), ApiError> {
    let mut violations = Violations::default();
    violations.reference("language_id", "Language", template.language_id);
    if template.code.trim().is_empty() {
        violations.push("code", "Code is required");
    }
    violations.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> AlgorithmCreate {
        AlgorithmCreate {
            title: "Binary Search".into(),
            category_id: 1,
            difficulty_id: 2,
            concept_summary: "Halve a sorted search space every step.".into(),
            core_formulas: Some(vec![CoreFormula {
                name: "Midpoint".into(),
                formula: "mid = lo + (hi - lo) / 2".into(),
                description: "Avoids overflow".into(),
            }]),
            thought_process: None,
            application_conditions: None,
            time_complexity: "O(log n)".into(),
            space_complexity: "O(1)".into(),
            problem_types: None,
            common_mistakes: None,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(validate_create(&valid_create()).is_ok());
    }

    #[test]
    fn reports_every_failing_field() {
        let mut input = valid_create();
        input.title = "ab".into();
        input.concept_summary = "too short".into();
        input.time_complexity = String::new();
        input.core_formulas = Some(vec![CoreFormula {
            name: String::new(),
            formula: "x".into(),
            description: "y".into(),
        }]);

        let err = validate_create(&input).expect_err("invalid");
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "title",
                "concept_summary",
                "time_complexity",
                "core_formulas.0.name"
            ]
        );
        assert!(
            err.user_message("Failed to save algorithm")
                .starts_with("title: Title must be at least 3 characters")
        );
    }

    #[test]
    fn update_checks_only_present_fields() {
        assert!(validate_update(&AlgorithmUpdate::default()).is_ok());

        let patch = AlgorithmUpdate {
            space_complexity: Some("O(".repeat(30)),
            ..AlgorithmUpdate::default()
        };
        let err = validate_update(&patch).expect_err("too long");
        assert_eq!(err.fields()[0].field, "space_complexity");
    }

    #[test]
    fn template_requires_code() {
        let template = CodeTemplateCreate {
            language_id: 1,
            code: "  ".into(),
            explanation: None,
        };
        let err = validate_template(&template).expect_err("empty code");
        assert_eq!(err.fields()[0].field, "code");
    }
}
