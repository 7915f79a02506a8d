use tracing::{info, warn};

use crate::error::NotifierError;
use crate::payload::{parse_message, OutboundEvent};
use crate::servicenow::{DeliveryOutcome, EventSink};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub index: usize,
    pub resource: String,
    pub outcome: DeliveryOutcome,
}

/// Per-record outcomes of one invocation, in delivery order.
#[derive(Debug, Default)]
pub struct InvocationReport {
    pub records: Vec<RecordOutcome>,
}

impl InvocationReport {
    pub fn created(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Created { .. }))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.records.len() - self.created()
    }

    /// `(index, resource)` of every record the remote side refused.
    pub fn rejections(&self) -> Vec<(usize, &str)> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, DeliveryOutcome::Rejected { .. }))
            .map(|r| (r.index, r.resource.as_str()))
            .collect()
    }
}

pub struct Notifier<S> {
    sink: S,
}

impl<S: EventSink> Notifier<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Forwards every message to the sink, one request each, in order.
    ///
    /// A rejected record does not stop the batch. A message that is not JSON
    /// or a transport failure aborts the invocation; records sent before it
    /// stay sent.
    pub async fn process<I, M>(&self, messages: I) -> Result<InvocationReport, NotifierError>
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let mut report = InvocationReport::default();

        for (index, message) in messages.into_iter().enumerate() {
            let message = parse_message(message.as_ref())?;
            let event = OutboundEvent::from_message(&message)?;

            let outcome = self.sink.create_event(&event).await?;
            match &outcome {
                DeliveryOutcome::Created { sys_id: Some(sys_id) } => {
                    info!(record = index, resource = %event.resource, sys_id = %sys_id, "Event created successfully");
                }
                DeliveryOutcome::Created { sys_id: None } => {
                    warn!(record = index, resource = %event.resource, "Event created but response carried no sys_id");
                }
                DeliveryOutcome::Rejected { status, body } => {
                    warn!(record = index, resource = %event.resource, status = status.as_u16(), body = %body, "Failed to create event");
                }
            }

            report.records.push(RecordOutcome {
                index,
                resource: event.resource,
                outcome,
            });
        }

        Ok(report)
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Answers with scripted outcomes (default: created with a sequential id)
    /// and keeps every event it was handed.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: Mutex<Vec<OutboundEvent>>,
        pub responses: Mutex<VecDeque<DeliveryOutcome>>,
        pub fail_transport_at: Option<usize>,
    }

    impl RecordingSink {
        pub(crate) fn with_responses(responses: Vec<DeliveryOutcome>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        pub(crate) fn sent(&self) -> Vec<OutboundEvent> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        async fn create_event(
            &self,
            event: &OutboundEvent,
        ) -> Result<DeliveryOutcome, NotifierError> {
            let position = {
                let mut sent = self.sent.lock().unwrap();
                sent.push(event.clone());
                sent.len() - 1
            };

            if self.fail_transport_at == Some(position) {
                let err = reqwest::Client::new()
                    .post("not a url")
                    .build()
                    .unwrap_err();
                return Err(NotifierError::Transport(err));
            }

            let scripted = self.responses.lock().unwrap().pop_front();
            Ok(scripted.unwrap_or_else(|| DeliveryOutcome::Created {
                sys_id: Some(format!("sys-{position}")),
            }))
        }
    }

    fn health_message() -> String {
        json!({
            "detail": { "eventArn": "arn:aws:health:x" },
            "detail-type": "AWS Health Event"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_created_record_reports_sys_id() {
        let sink = RecordingSink::with_responses(vec![DeliveryOutcome::from_response(
            StatusCode::CREATED,
            r#"{"result":{"sys_id":"abc123"}}"#,
        )]);
        let notifier = Notifier::new(sink);

        let report = notifier.process(vec![health_message()]).await.unwrap();

        let sent = notifier.sink().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].resource, "arn:aws:health:x");
        assert_eq!(sent[0].event_type, "AWS Health Event");
        assert_eq!(
            report.records,
            vec![RecordOutcome {
                index: 0,
                resource: "arn:aws:health:x".to_string(),
                outcome: DeliveryOutcome::Created {
                    sys_id: Some("abc123".to_string())
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_rejection_is_recorded_and_batch_continues() {
        let sink = RecordingSink::with_responses(vec![
            DeliveryOutcome::from_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error"),
            DeliveryOutcome::from_response(StatusCode::CREATED, r#"{"result":{"sys_id":"def456"}}"#),
        ]);
        let notifier = Notifier::new(sink);

        let report = notifier
            .process([health_message(), json!({}).to_string()])
            .await
            .unwrap();

        assert_eq!(notifier.sink().sent().len(), 2);
        assert_eq!(
            report.records[0].outcome,
            DeliveryOutcome::Rejected {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "Internal Error".to_string()
            }
        );
        assert_eq!(report.records[1].resource, "Unknown");
        assert_eq!(report.created(), 1);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.rejections(), vec![(0, "arn:aws:health:x")]);
    }

    #[tokio::test]
    async fn test_one_call_per_record() {
        let messages: Vec<String> = (0..5)
            .map(|i| json!({ "detail": { "eventArn": format!("arn:{i}") } }).to_string())
            .collect();
        let responses = (0..5)
            .map(|i| match i % 2 {
                1 => DeliveryOutcome::Rejected {
                    status: StatusCode::UNAUTHORIZED,
                    body: String::new(),
                },
                _ => DeliveryOutcome::Created { sys_id: None },
            })
            .collect();
        let notifier = Notifier::new(RecordingSink::with_responses(responses));

        let report = notifier.process(&messages).await.unwrap();

        let sent = notifier.sink().sent();
        assert_eq!(sent.len(), 5);
        assert_eq!(report.records.len(), 5);
        let resources: Vec<&str> = sent.iter().map(|e| e.resource.as_str()).collect();
        assert_eq!(resources, ["arn:0", "arn:1", "arn:2", "arn:3", "arn:4"]);
        assert_eq!(report.rejected(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let notifier = Notifier::new(RecordingSink::default());

        let report = notifier.process(Vec::<String>::new()).await.unwrap();

        assert!(report.records.is_empty());
        assert!(notifier.sink().sent().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_aborts_after_earlier_records() {
        let notifier = Notifier::new(RecordingSink::default());

        let result = notifier
            .process([health_message(), "{broken".to_string(), health_message()])
            .await;

        assert!(matches!(result, Err(NotifierError::Parse(_))));
        assert_eq!(notifier.sink().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let sink = RecordingSink {
            fail_transport_at: Some(0),
            ..Default::default()
        };
        let notifier = Notifier::new(sink);

        let result = notifier.process([health_message(), health_message()]).await;

        assert!(matches!(result, Err(NotifierError::Transport(_))));
        assert_eq!(notifier.sink().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_description_carries_whole_message() {
        let notifier = Notifier::new(RecordingSink::default());
        let original = json!({
            "detail-type": "AWS Health Event",
            "detail": { "eventArn": "arn:aws:health:x", "statusCode": "open" },
            "account": "123456789012"
        });

        notifier.process([original.to_string()]).await.unwrap();

        let sent = notifier.sink().sent();
        let described: Value = serde_json::from_str(&sent[0].description).unwrap();
        assert_eq!(described, original);
    }
}
