use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error(transparent)]
    Cloud(#[from] cloud::CloudError),
    #[error("no trip selected; create one with `tripmate trip new`")]
    NoTrip,
    #[error("{0}")]
    Usage(String),
}
