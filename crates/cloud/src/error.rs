//! Errors raised while talking to the local cache or the remote store.
//!
//! None of them is fatal: callers report them and keep the last good local
//! state.
use engine::EngineError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    /// The remote store could not be reached or initialized.
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("trip is not linked to the cloud")]
    NotLinked,
    #[error("trip has no days to upload")]
    EmptyTrip,
    #[error("malformed document {key}: {reason}")]
    Malformed { key: String, reason: String },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    /// Whether the error means the remote could not be used at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
        )
    }
}
