use thiserror::Error;

/// A webhook body that cannot be turned into a `MediaEvent`
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed webhook payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Webhook payload is missing required field '{0}'")]
    MissingField(&'static str),
}
