//! Fetch layer
//!
//! This module handles every request made to the catalog:
//! - Pooled browsing contexts with global request spacing ([`pool`])
//! - Round-robin proxy identities ([`proxy`])
//! - The retry state machine and injectable sleeping ([`retry`])
//! - HTTP page loading and outcome classification ([`source`])
//! - Compliance, retries and pagination for a whole query ([`fetcher`])

pub mod fetcher;
pub mod pool;
pub mod proxy;
pub mod retry;
pub mod source;

pub use fetcher::{FetchError, FetchedPage, Fetcher, LoadedPage};
pub use pool::{BrowsingContext, PoolClosed, ResourcePool, Slot};
pub use proxy::{ProxyIdentity, ProxyRotator};
pub use retry::{FetchState, RecordingSleeper, RetryPolicy, RetryStep, Sleeper, TokioSleeper};
pub use source::{build_http_client, user_agent_string, HttpPageSource, LoadOutcome, PageSource};
