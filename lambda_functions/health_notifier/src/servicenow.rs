use std::future::Future;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

use crate::config::NotifierConfig;
use crate::error::NotifierError;
use crate::payload::{lookup_str, OutboundEvent};

/// Result of one create request, as judged from the response status.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Created { sys_id: Option<String> },
    Rejected { status: StatusCode, body: String },
}

impl DeliveryOutcome {
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::CREATED {
            let sys_id = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|value| lookup_str(&value, &["result", "sys_id"]).map(str::to_owned));
            DeliveryOutcome::Created { sys_id }
        } else {
            DeliveryOutcome::Rejected {
                status,
                body: body.to_string(),
            }
        }
    }
}

/// Destination for outbound events. Transport failures are errors; a
/// response of any status is an outcome.
pub trait EventSink {
    fn create_event(
        &self,
        event: &OutboundEvent,
    ) -> impl Future<Output = Result<DeliveryOutcome, NotifierError>> + Send;
}

pub struct ServiceNowClient {
    http: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl ServiceNowClient {
    pub fn new(config: &NotifierConfig) -> Result<Self, NotifierError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

impl EventSink for ServiceNowClient {
    async fn create_event(&self, event: &OutboundEvent) -> Result<DeliveryOutcome, NotifierError> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(event)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        Ok(DeliveryOutcome::from_response(status, &body))
    }
}
