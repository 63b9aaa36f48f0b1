use thiserror::Error;

use crate::api::ApiError;
use crate::cache::ErrorInfo;
use crate::config::LoadError;
use crate::infra::error::InfraError;
use crate::mutation::MutationError;
use crate::session::SessionError;

/// Top-level error for the `algoref` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Session(#[from] SessionError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("query failed: {0}")]
    Query(ErrorInfo),
    #[error("not signed in; sign in at {login_path} (`algoref login`)")]
    Unauthenticated { login_path: String },
}

impl From<ErrorInfo> for AppError {
    fn from(info: ErrorInfo) -> Self {
        Self::Query(info)
    }
}
