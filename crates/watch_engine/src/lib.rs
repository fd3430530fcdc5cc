//! Watch engine: page fetching, webhook dispatch and the polling scheduler.
mod decode;
mod dispatch;
mod extract;
mod fetch;
mod scheduler;
mod types;

pub use dispatch::{DispatchSettings, ReqwestWebhookDispatcher, WebhookDispatcher, WebhookPayload};
pub use extract::select_fragments;
pub use fetch::{normalize_url, ContentFetcher, FetchSettings, ReqwestContentFetcher};
pub use scheduler::{Clock, Scheduler, SchedulerConfig, TickSummary};
pub use types::{DispatchError, FailureKind, FetchError};
