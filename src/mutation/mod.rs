//! Mutation orchestrator: admin writes plus the cache invalidation they imply.

mod orchestrator;
mod validate;

pub use orchestrator::{MutationError, MutationOrchestrator, SAVE_FAILED_MESSAGE};
pub use validate::{
    COMPLEXITY_MAX_CHARS, SUMMARY_MIN_CHARS, TITLE_MAX_CHARS, TITLE_MIN_CHARS, validate_create,
    validate_template, validate_update,
};
