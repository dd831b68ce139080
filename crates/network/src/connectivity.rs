// crates/network/src/connectivity.rs
//! Connection category reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// What kind of network the device is currently on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionCategory {
    #[default]
    Unknown,
    WiFi,
    Cellular,
    Ethernet,
    None,
}

impl ConnectionCategory {
    /// Returns true when traffic on this connection is metered
    pub fn is_metered(&self) -> bool {
        matches!(self, ConnectionCategory::Cellular)
    }

    /// Maps an IANA interface type number to a category.
    ///
    /// 6 is ethernetCsmacd, 71 is ieee80211, 243/244 are the 3GPP WWAN types.
    pub fn from_iana_interface_type(interface_type: u32) -> Self {
        match interface_type {
            6 => ConnectionCategory::Ethernet,
            71 => ConnectionCategory::WiFi,
            243 | 244 => ConnectionCategory::Cellular,
            _ => ConnectionCategory::Unknown,
        }
    }
}

impl fmt::Display for ConnectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionCategory::Unknown => write!(f, "unknown"),
            ConnectionCategory::WiFi => write!(f, "wifi"),
            ConnectionCategory::Cellular => write!(f, "cellular"),
            ConnectionCategory::Ethernet => write!(f, "ethernet"),
            ConnectionCategory::None => write!(f, "none"),
        }
    }
}

impl FromStr for ConnectionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(ConnectionCategory::Unknown),
            "wifi" | "wlan" => Ok(ConnectionCategory::WiFi),
            "cellular" | "mobile" | "wwan" => Ok(ConnectionCategory::Cellular),
            "ethernet" => Ok(ConnectionCategory::Ethernet),
            "none" | "offline" => Ok(ConnectionCategory::None),
            other => Err(format!("unknown connection category '{}'", other)),
        }
    }
}

/// Reports the current connection category.
///
/// Platform integrations implement this; the route selector only ever asks
/// for the current value.
pub trait NetworkTypeProbe: Send + Sync {
    fn current_category(&self) -> ConnectionCategory;
}

/// A probe that always reports the same category
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedNetworkProbe(pub ConnectionCategory);

impl NetworkTypeProbe for FixedNetworkProbe {
    fn current_category(&self) -> ConnectionCategory {
        self.0
    }
}

/// Publishes connection category changes to any number of subscribers.
///
/// The platform layer calls [`publish`](Self::publish) from its connectivity
/// callback; interested components hold a receiver from
/// [`subscribe`](Self::subscribe) and re-run route selection on change.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<ConnectionCategory>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor starting at `initial`
    pub fn new(initial: ConnectionCategory) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Records a new category. Returns true if it differs from the previous one.
    pub fn publish(&self, category: ConnectionCategory) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == category {
                false
            } else {
                *current = category;
                true
            }
        });
        if changed {
            log::info!("Network connection changed to {}", category);
        }
        changed
    }

    /// Receives every subsequent category change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionCategory> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(ConnectionCategory::Unknown)
    }
}

impl NetworkTypeProbe for ConnectivityMonitor {
    fn current_category(&self) -> ConnectionCategory {
        *self.sender.borrow()
    }
}
