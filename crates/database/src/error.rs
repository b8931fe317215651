use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("No registered user for this chat identity.")]
    UserNotFound,

    #[error("Refusing to persist an invalid alert: {0}")]
    InvalidAlert(String),

    #[error("A stored row could not be decoded: {0}")]
    Decode(String),
}
