use thiserror::Error;

use crate::settings::StoreError;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    Api(#[from] bravia_api::ApiError),

    #[error("Command error: {0}")]
    Command(#[from] bravia_api::CommandError),

    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    #[error("Device has no address configured: {0}")]
    MissingAddress(String),

    #[error("Device session closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, SdkError>;
