use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::NotifierError;

const INSTANCE_URL_VAR: &str = "SERVICENOW_INSTANCE_URL";
const USERNAME_VAR: &str = "SERVICENOW_USERNAME";
const PASSWORD_VAR: &str = "SERVICENOW_PASSWORD";
const SECRET_VAR: &str = "SERVICENOW_CREDENTIALS_SECRET";
const TIMEOUT_VAR: &str = "SERVICENOW_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const EVENT_TABLE_PATH: &str = "/api/now/table/em_event";

/// Username/password pair as stored in the credentials secret.
#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Connection settings for the ServiceNow instance, read once at cold start.
#[derive(Clone)]
pub struct NotifierConfig {
    pub instance_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("instance_url", &self.instance_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NotifierConfig {
    /// Reads the configuration from the Lambda environment, pulling the
    /// credentials from Secrets Manager when `SERVICENOW_CREDENTIALS_SECRET` is set.
    pub async fn load() -> Result<Self, NotifierError> {
        let lookup = |key: &str| std::env::var(key).ok();

        let credentials = match non_empty(lookup(SECRET_VAR)) {
            Some(secret_id) => Some(fetch_credentials(&secret_id).await?),
            None => None,
        };

        Self::from_lookup(lookup, credentials)
    }

    fn from_lookup<F>(lookup: F, credentials: Option<Credentials>) -> Result<Self, NotifierError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instance_url = required(&lookup, INSTANCE_URL_VAR)?
            .trim_end_matches('/')
            .to_string();
        if !instance_url.starts_with("https://") && !instance_url.starts_with("http://") {
            return Err(NotifierError::Config(format!(
                "{INSTANCE_URL_VAR} must be an http(s) URL, got {instance_url}"
            )));
        }

        let Credentials { username, password } = match credentials {
            Some(credentials) => credentials,
            None => Credentials {
                username: required(&lookup, USERNAME_VAR)?,
                password: required(&lookup, PASSWORD_VAR)?,
            },
        };

        let timeout = match non_empty(lookup(TIMEOUT_VAR)) {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            instance_url,
            username,
            password,
            timeout,
        })
    }

    /// Full URL of the event management table.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.instance_url, EVENT_TABLE_PATH)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, NotifierError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(key))
        .ok_or_else(|| NotifierError::Config(format!("Environment variable not set: {key}")))
}

fn parse_timeout(raw: &str) -> Result<Duration, NotifierError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(NotifierError::Config(format!(
            "{TIMEOUT_VAR} must be a positive number of seconds, got {raw}"
        ))),
    }
}

async fn fetch_credentials(secret_id: &str) -> Result<Credentials, NotifierError> {
    let config = aws_config::load_from_env().await;
    let client = aws_sdk_secretsmanager::Client::new(&config);

    let output = client
        .get_secret_value()
        .secret_id(secret_id)
        .send()
        .await
        .map_err(|e| NotifierError::Secret(format!("{secret_id}: {e}")))?;

    let secret = output
        .secret_string()
        .ok_or_else(|| NotifierError::Secret(format!("{secret_id} has no SecretString")))?;

    parse_credentials(secret)
}

fn parse_credentials(secret: &str) -> Result<Credentials, NotifierError> {
    serde_json::from_str(secret)
        .map_err(|e| NotifierError::Secret(format!("malformed credentials JSON: {e}")))
}
