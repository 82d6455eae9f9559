//! Control-channel messages from the hosting page

use super::{HydrationReport, Worker};
use crate::error::ShellcacheResult;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// A control-channel signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate a waiting generation now; clients see it after a reload
    ForceActivate,
    /// Fetch every manifest resource not yet cached
    HydrateOffline,
    /// Anything else, ignored for forward compatibility
    Unknown(String),
}

impl ControlMessage {
    pub fn parse(data: &str) -> Self {
        match data {
            "skipWaiting" | "force-activate" => Self::ForceActivate,
            "downloadOffline" | "hydrate-offline" => Self::HydrateOffline,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Wire value sent by the hosting page
    pub fn as_wire(&self) -> &str {
        match self {
            Self::ForceActivate => "skipWaiting",
            Self::HydrateOffline => "downloadOffline",
            Self::Unknown(data) => data,
        }
    }
}

impl FromStr for ControlMessage {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// What handling a message did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    SkipWaitingRequested,
    Hydrated(HydrationReport),
    Ignored,
}

impl Worker {
    /// Handle one control-channel message
    pub async fn handle_message(&self, data: &str) -> ShellcacheResult<MessageOutcome> {
        match ControlMessage::parse(data) {
            ControlMessage::ForceActivate => {
                info!("Skip-waiting requested by client");
                self.host.skip_waiting().await;
                Ok(MessageOutcome::SkipWaitingRequested)
            }
            ControlMessage::HydrateOffline => {
                let report = self.hydrate_offline().await?;
                Ok(MessageOutcome::Hydrated(report))
            }
            ControlMessage::Unknown(data) => {
                debug!("Ignoring unknown message {:?}", data);
                Ok(MessageOutcome::Ignored)
            }
        }
    }
}
