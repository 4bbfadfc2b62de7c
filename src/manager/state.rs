//! Service state machine
//!
//! ```text
//!     ┌──────────────┐
//!     │ Unregistered │◄─────────────────┐
//!     └──────┬───────┘                  │
//!            │ start                    │
//!     ┌──────▼───────┐                  │
//!     │   Starting   │                  │
//!     └──────┬───────┘                  │
//!            │ load                     │
//!     ┌──────▼───────┐  file gone  ┌────┴─────┐
//!     │  Registered  │────────────►│  Stale   │
//!     └──────┬───────┘             └────┬─────┘
//!            │ unload                   │ remove
//!     ┌──────▼───────┐                  │
//!     │   Stopping   │◄─────────────────┘
//!     └──────────────┘
//! ```
//!
//! Only `Unregistered`, `Registered`, and `Stale` are ever observed from
//! outside; the others exist while an operation is in flight.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Not known to the supervisor
    Unregistered,
    /// Descriptor being rendered and written
    Starting,
    /// Known to the supervisor, descriptor on disk
    Registered,
    /// Known to the supervisor, descriptor missing
    Stale,
    /// Unload or kill in flight
    Stopping,
}

impl ServiceState {
    pub fn from_observed(loaded: bool, descriptor_exists: bool) -> Self {
        match (loaded, descriptor_exists) {
            (false, _) => Self::Unregistered,
            (true, true) => Self::Registered,
            (true, false) => Self::Stale,
        }
    }

    /// Registered with the supervisor, with or without a file
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Registered | Self::Stale)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "stopped",
            Self::Starting => "starting",
            Self::Registered => "started",
            Self::Stale => "stale",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
