use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to load credentials secret: {0}")]
    Secret(String),
    #[error("Failed to parse SNS message: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Failed to render event description: {0}")]
    Render(String),
    #[error("Request to ServiceNow failed: {0}")]
    Transport(#[from] reqwest::Error),
}
