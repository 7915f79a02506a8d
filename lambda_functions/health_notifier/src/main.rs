mod config;
mod error;
mod event_handler;
mod notifier;
mod payload;
mod servicenow;

use aws_lambda_events::event::sns::SnsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

use crate::config::NotifierConfig;
use crate::event_handler::function_handler;
use crate::notifier::Notifier;
use crate::servicenow::ServiceNowClient;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Configuration and the HTTP client are built once and shared by every invocation
    let config = NotifierConfig::load().await?;
    let notifier = Notifier::new(ServiceNowClient::new(&config)?);
    info!(endpoint = %config.endpoint(), timeout_secs = config.timeout.as_secs(), "Notifier initialized");

    let notifier_ref = &notifier;
    run(service_fn(move |event: LambdaEvent<SnsEvent>| async move {
        function_handler(event, notifier_ref).await
    }))
    .await
}
