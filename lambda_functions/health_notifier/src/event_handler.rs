use aws_lambda_events::event::sns::SnsEvent;
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use tracing::{info, warn};

use crate::notifier::Notifier;
use crate::servicenow::EventSink;

const SUCCESS_MESSAGE: &str = "Lambda function executed successfully!";

/// Acknowledgment returned once every record was attempted. It does not
/// reflect records the remote side rejected.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::from(SUCCESS_MESSAGE).to_string(),
        }
    }
}

pub(crate) async fn function_handler<S: EventSink>(
    event: LambdaEvent<SnsEvent>,
    notifier: &Notifier<S>,
) -> Result<InvocationResponse, Error> {
    let request_id = event.context.request_id;
    let messages = event.payload.records.into_iter().map(|record| record.sns.message);

    let report = notifier.process(messages).await?;
    info!(
        request_id = %request_id,
        records = report.records.len(),
        created = report.created(),
        rejected = report.rejected(),
        "Invocation complete"
    );
    if report.rejected() > 0 {
        warn!(request_id = %request_id, rejections = ?report.rejections(), "Some events were not created");
    }

    Ok(InvocationResponse::success())
}
