//! brew-services - background services for installed packages
//!
//! Layers start/stop/restart/list/cleanup on top of launchd: one plist
//! descriptor per service, loaded and unloaded through `launchctl`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    commands                      │
//! ├─────────────────────────────────────────────────┤
//! │          Manager (list/cleanup/batches)          │
//! │          Service (start/stop/restart/kill)       │
//! ├────────────┬───────────────┬────────────────────┤
//! │  template  │     store     │     supervisor     │
//! ├────────────┴───────────────┴────────────────────┤
//! │          package registry  │  context            │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The supervisor and the scope directory are the only sources of truth;
//! nothing is cached between calls.

pub mod context;
pub mod label;
pub mod manager;
pub mod package;
pub mod store;
pub mod supervisor;
pub mod template;

pub use context::ExecContext;
pub use manager::{Clock, KillPolicy, Manager, Service, ServiceError, ServiceState, TokioClock};
pub use package::{KegRegistry, Package, Registry};
pub use store::DescriptorStore;
pub use supervisor::{Launchctl, Registration, Supervisor};
pub use template::TemplateSource;
