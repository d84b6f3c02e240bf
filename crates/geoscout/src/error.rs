use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Tag error: {0}")]
    Tag(#[from] crate::tags::TagError),
    #[error("Validation error: {0}")]
    Validation(#[from] crate::validation::ValidationError),
    #[error("Query error: {0}")]
    Query(#[from] crate::query::QueryError),
    #[error("Exploration error: {0}")]
    Exploration(#[from] crate::exploration::ExplorationError),
    #[error("Data error: {0}")]
    Data(#[from] geoscout_data::DataError),
    #[error("Locale error: {0}")]
    Locale(#[from] crate::locale::InvalidLocale),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeoScoutError>;
