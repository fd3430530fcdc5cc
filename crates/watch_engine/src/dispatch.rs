use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use watch_core::{JobId, WatchJob};

use crate::DispatchError;

const USER_AGENT: &str = concat!("page-watch/", env!("CARGO_PKG_VERSION"));

/// JSON body posted to a job's target endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub job_id: JobId,
    pub url: String,
    pub selector: String,
    pub previous_content: Option<String>,
    pub new_content: Option<String>,
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn new(
        job: &WatchJob,
        previous_content: Option<&str>,
        new_content: Option<&str>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job.id,
            url: job.url.clone(),
            selector: job.selector_description(),
            previous_content: previous_content.map(ToOwned::to_owned),
            new_content: new_content.map(ToOwned::to_owned),
            timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Sends the change notification for a triggered job. One attempt, no retry.
#[async_trait::async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        job: &WatchJob,
        previous_content: Option<&str>,
        new_content: Option<&str>,
    ) -> Result<(), DispatchError>;
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestWebhookDispatcher {
    client: reqwest::Client,
    settings: DispatchSettings,
}

impl ReqwestWebhookDispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

impl Default for ReqwestWebhookDispatcher {
    fn default() -> Self {
        Self::new(DispatchSettings::default())
    }
}

#[async_trait::async_trait]
impl WebhookDispatcher for ReqwestWebhookDispatcher {
    async fn dispatch(
        &self,
        job: &WatchJob,
        previous_content: Option<&str>,
        new_content: Option<&str>,
    ) -> Result<(), DispatchError> {
        let payload = WebhookPayload::new(job, previous_content, new_content, Utc::now());
        let response = self
            .client
            .post(&job.target_endpoint)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&payload)
            .timeout(self.settings.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DispatchError::Timeout
                } else {
                    DispatchError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use watch_core::{JobStore, JobSubmission, SelectorKind};

    use super::WebhookPayload;

    #[test]
    fn payload_uses_camel_case_and_iso_timestamp() {
        let mut store = JobStore::new();
        let id = store
            .add(JobSubmission {
                url: "example.com".to_string(),
                selector_kind: SelectorKind::ClassName,
                selector_value: "price".to_string(),
                trigger_value: None,
                target_endpoint: "https://hooks.example.com".to_string(),
            })
            .unwrap();
        let job = store.get(id).unwrap();
        let sent_at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

        let payload = WebhookPayload::new(job, Some("10 EUR"), None, sent_at);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "jobId": id,
                "url": "example.com",
                "selector": "Class Name: price",
                "previousContent": "10 EUR",
                "newContent": null,
                "timestamp": "2026-03-04T05:06:07.000Z",
            })
        );
    }
}
