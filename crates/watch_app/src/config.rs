//! RON configuration file for the watcher.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context};
use serde::Deserialize;
use watch_core::{JobSubmission, SelectorKind};
use watch_engine::{DispatchSettings, FetchSettings, SchedulerConfig};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub jobs: Vec<ConfiguredJob>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            poll_interval_secs: 30,
            fetch_timeout_secs: fetch.request_timeout.as_secs(),
            dispatch_timeout_secs: DispatchSettings::default().timeout.as_secs(),
            max_page_bytes: fetch.max_bytes,
            jobs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfiguredJob {
    pub url: String,
    pub selector_kind: ConfiguredSelector,
    pub selector_value: String,
    #[serde(default)]
    pub trigger_value: Option<String>,
    pub target_endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ConfiguredSelector {
    ClassName,
    Id,
    TagName,
}

impl From<ConfiguredSelector> for SelectorKind {
    fn from(kind: ConfiguredSelector) -> Self {
        match kind {
            ConfiguredSelector::ClassName => SelectorKind::ClassName,
            ConfiguredSelector::Id => SelectorKind::Id,
            ConfiguredSelector::TagName => SelectorKind::TagName,
        }
    }
}

impl From<ConfiguredJob> for JobSubmission {
    fn from(job: ConfiguredJob) -> Self {
        JobSubmission {
            url: job.url,
            selector_kind: job.selector_kind.into(),
            selector_value: job.selector_value,
            trigger_value: job.trigger_value,
            target_endpoint: job.target_endpoint,
        }
    }
}

impl WatchConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: WatchConfig = ron::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be positive");
        ensure!(self.fetch_timeout_secs > 0, "fetch_timeout_secs must be positive");
        ensure!(
            self.dispatch_timeout_secs > 0,
            "dispatch_timeout_secs must be positive"
        );
        ensure!(self.max_page_bytes > 0, "max_page_bytes must be positive");
        Ok(())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_bytes: self.max_page_bytes,
            ..FetchSettings::default()
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            timeout: Duration::from_secs(self.dispatch_timeout_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs),
            ..SchedulerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use tempfile::NamedTempFile;
    use watch_core::{JobSubmission, SelectorKind};

    use super::WatchConfig;

    #[test]
    fn missing_fields_take_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
                poll_interval_secs: 5,
                jobs: [
                    (
                        url: "example.com",
                        selector_kind: TagName,
                        selector_value: "h1",
                        target_endpoint: "https://hooks.example.com/a",
                    ),
                    (
                        url: "shop.example.com",
                        selector_kind: Id,
                        selector_value: "stock",
                        trigger_value: Some("Sold out"),
                        target_endpoint: "https://hooks.example.com/b",
                    ),
                ],
            )"#
        )
        .unwrap();

        let config = WatchConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.dispatch_timeout_secs, 10);
        assert_eq!(
            config.scheduler_config().poll_interval,
            Duration::from_secs(5)
        );
        config.validate().unwrap();

        let submissions: Vec<JobSubmission> = config.jobs.into_iter().map(Into::into).collect();
        assert_eq!(submissions[0].selector_kind, SelectorKind::TagName);
        assert_eq!(submissions[0].trigger_value, None);
        assert_eq!(submissions[1].trigger_value.as_deref(), Some("Sold out"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = WatchConfig::load("/nonexistent/watch.ron".as_ref()).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/watch.ron"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = WatchConfig {
            poll_interval_secs: 0,
            ..WatchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
