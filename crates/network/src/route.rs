// crates/network/src/route.rs
//! Choosing which server address to use for a session
//!
//! A home server is usually reachable through a LAN address and an external
//! (DDNS) address. Which one works depends on where the device is, so the
//! selector pings the candidates and keeps the first that answers.

use crate::client::HttpTransport;
use crate::connectivity::NetworkTypeProbe;
use crate::error::NetworkError;
use crate::request::{ping_url, Credentials};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use sublink_resilience::{with_cancel, with_timeout, CancelSignal};

/// Reason reported when neither candidate is set
pub const NO_URLS_CONFIGURED: &str = "No server URLs configured";
/// Reason reported when a single probed server answers with a failure
pub const PING_FAILED: &str = "Server ping failed";
/// Reason reported when a single probed server does not answer in time
pub const CONNECTION_TIMEOUT: &str = "Connection timeout";
/// Reason reported when neither raced candidate answers in time
pub const ALL_ROUTES_FAILED: &str = "All routes failed or timed out";
/// Reason reported when the caller cancels selection
pub const SELECTION_CANCELLED: &str = "Route selection cancelled";

/// Which configured address a candidate is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// Usually the LAN address
    Primary,
    /// Usually the external address, reachable from anywhere
    Secondary,
}

/// One candidate base URL. The URL may be unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub role: EndpointRole,
    pub url: Option<String>,
}

impl EndpointCandidate {
    /// The URL if it is set to something other than whitespace
    pub fn url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// The primary and secondary candidates for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidates {
    pub primary: EndpointCandidate,
    pub secondary: EndpointCandidate,
}

impl EndpointCandidates {
    pub fn new(primary: Option<String>, secondary: Option<String>) -> Self {
        Self {
            primary: EndpointCandidate {
                role: EndpointRole::Primary,
                url: primary,
            },
            secondary: EndpointCandidate {
                role: EndpointRole::Secondary,
                url: secondary,
            },
        }
    }
}

/// Outcome of route selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RouteSelectionResult {
    Selected { url: String },
    Failed { reason: String },
}

impl RouteSelectionResult {
    fn failed(reason: &str) -> Self {
        RouteSelectionResult::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RouteSelectionResult::Selected { .. })
    }

    pub fn selected_url(&self) -> Option<&str> {
        match self {
            RouteSelectionResult::Selected { url } => Some(url),
            RouteSelectionResult::Failed { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            RouteSelectionResult::Selected { .. } => None,
            RouteSelectionResult::Failed { reason } => Some(reason),
        }
    }
}

impl fmt::Display for RouteSelectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSelectionResult::Selected { url } => write!(f, "selected {}", url),
            RouteSelectionResult::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Tuning for route selection
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    /// Deadline for a single probe and for the two-candidate race as a whole
    pub probe_timeout: Duration,
    /// On a metered connection, probe only the secondary candidate.
    /// Disable on platforms where the LAN address may still be reachable
    /// while the cellular radio is the default route.
    pub secondary_only_on_cellular: bool,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(2),
            secondary_only_on_cellular: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeOutcome {
    Reachable,
    Failed,
    TimedOut,
}

/// Picks one reachable base URL out of the configured candidates
#[derive(Clone)]
pub struct RouteSelector {
    transport: Arc<dyn HttpTransport>,
    network: Arc<dyn NetworkTypeProbe>,
    policy: RoutePolicy,
}

impl RouteSelector {
    pub fn new(transport: Arc<dyn HttpTransport>, network: Arc<dyn NetworkTypeProbe>) -> Self {
        Self {
            transport,
            network,
            policy: RoutePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Determines the base URL to use for this session.
    ///
    /// Never fails with an error: every problem is reported as
    /// [`RouteSelectionResult::Failed`] with a reason suitable for display.
    pub async fn select(
        &self,
        candidates: &EndpointCandidates,
        credentials: &Credentials,
    ) -> RouteSelectionResult {
        let result = match (candidates.primary.url(), candidates.secondary.url()) {
            (None, None) => RouteSelectionResult::failed(NO_URLS_CONFIGURED),
            (Some(url), None) | (None, Some(url)) => self.select_single(url, credentials).await,
            (Some(primary), Some(secondary)) => {
                let category = self.network.current_category();
                if self.policy.secondary_only_on_cellular && category.is_metered() {
                    log::debug!("On {} connection, probing secondary address only", category);
                    self.select_single(secondary, credentials).await
                } else {
                    self.race(primary, secondary, credentials).await
                }
            }
        };

        match &result {
            RouteSelectionResult::Selected { url } => log::info!("Selected server route {}", url),
            RouteSelectionResult::Failed { reason } => log::warn!("Route selection failed: {}", reason),
        }
        result
    }

    /// Like [`select`](Self::select), abandoning outstanding probes when
    /// `signal` is cancelled
    pub async fn select_with_cancel(
        &self,
        candidates: &EndpointCandidates,
        credentials: &Credentials,
        signal: &CancelSignal,
    ) -> RouteSelectionResult {
        match with_cancel(Some(signal), self.select(candidates, credentials)).await {
            Ok(result) => result,
            Err(_) => RouteSelectionResult::failed(SELECTION_CANCELLED),
        }
    }

    async fn select_single(&self, url: &str, credentials: &Credentials) -> RouteSelectionResult {
        match self.probe(url, credentials).await {
            ProbeOutcome::Reachable => RouteSelectionResult::Selected {
                url: url.to_string(),
            },
            ProbeOutcome::Failed => RouteSelectionResult::failed(PING_FAILED),
            ProbeOutcome::TimedOut => RouteSelectionResult::failed(CONNECTION_TIMEOUT),
        }
    }

    /// Probes both candidates at once and keeps the first that answers.
    /// Dropping the probe set when a winner is found cancels the loser.
    async fn race(&self, primary: &str, secondary: &str, credentials: &Credentials) -> RouteSelectionResult {
        let mut probes: FuturesUnordered<_> = [primary, secondary]
            .into_iter()
            .map(|url| async move { (url, self.probe(url, credentials).await) })
            .collect();

        let first_reachable = async {
            while let Some((url, outcome)) = probes.next().await {
                if outcome == ProbeOutcome::Reachable {
                    return Some(url);
                }
                log::debug!("Route {} lost the race ({:?})", url, outcome);
            }
            None
        };

        match with_timeout(self.policy.probe_timeout, first_reachable).await {
            Ok(Some(url)) => RouteSelectionResult::Selected {
                url: url.to_string(),
            },
            Ok(None) | Err(_) => RouteSelectionResult::failed(ALL_ROUTES_FAILED),
        }
    }

    /// One authenticated ping. Any failure is folded into the outcome.
    async fn probe(&self, base_url: &str, credentials: &Credentials) -> ProbeOutcome {
        let url = match ping_url(base_url, credentials) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Cannot probe {}: {}", base_url, e);
                return ProbeOutcome::Failed;
            }
        };

        let outcome = match with_timeout(self.policy.probe_timeout, self.transport.get(url.as_str())).await {
            Ok(Ok(response)) if response.is_success() => ProbeOutcome::Reachable,
            Ok(Ok(response)) => {
                log::debug!("Probe of {} returned {}", base_url, response.status);
                ProbeOutcome::Failed
            }
            Ok(Err(NetworkError::Timeout)) | Err(_) => ProbeOutcome::TimedOut,
            Ok(Err(e)) => {
                log::debug!("Probe of {} failed: {}", base_url, e);
                ProbeOutcome::Failed
            }
        };
        log::debug!("Probe of {}: {:?}", base_url, outcome);
        outcome
    }
}
