//! Service manager
//!
//! Binds packages to launchd labels and descriptor files, and runs the
//! lifecycle operations across them.

mod batch;
mod reconcile;
mod service;
mod state;

pub use batch::Outcome;
pub use reconcile::{CleanupReport, ListEntry, ListStatus};
pub use service::Service;
pub use state::ServiceState;

use std::time::Duration;

use crate::context::ExecContext;
use crate::label;
use crate::package::{Registry, RegistryError};
use crate::store::{DescriptorStore, StoreError};
use crate::supervisor::{Supervisor, SupervisorError};
use crate::template::TemplateError;

/// Sleeping, so the kill poll can be driven without real delays
#[allow(async_fn_in_trait)]
pub trait Clock {
    async fn sleep(&self, duration: Duration);
}

/// Real time via tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How long `kill` waits for the supervisor to drop a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for KillPolicy {
    fn default() -> Self {
        Self {
            attempts: 50,
            interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("No available package with the name \"{0}\"")]
    UnknownService(String),

    #[error("Package `{0}` has no service template and installed no locatable .plist file")]
    TemplateUnavailable(String),

    #[error("Service `{0}` already started, use `brew-services restart {0}` to restart")]
    AlreadyRunning(String),

    #[error("Service `{0}` is not started")]
    NotRunning(String),

    #[error("Failed to start `{name}`: {source}")]
    StartFailed {
        name: String,
        #[source]
        source: SupervisorError,
    },

    #[error("Failed to stop `{name}`: {source}")]
    StopFailed {
        name: String,
        #[source]
        source: SupervisorError,
    },

    #[error("Failed to kill `{name}`: {source}")]
    KillFailed {
        name: String,
        #[source]
        source: SupervisorError,
    },

    #[error("Service `{name}` still registered after {attempts} checks")]
    TimedOut { name: String, attempts: u32 },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for ServiceError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotInstalled(name) | RegistryError::InvalidName(name) => {
                Self::UnknownService(name)
            }
            other => Self::Registry(other),
        }
    }
}

/// Service manager for one execution context
pub struct Manager<R, S, C = TokioClock> {
    ctx: ExecContext,
    store: DescriptorStore,
    registry: R,
    supervisor: S,
    clock: C,
    kill_policy: KillPolicy,
}

impl<R: Registry, S: Supervisor, C: Clock> Manager<R, S, C> {
    /// Create a manager; descriptors go to the context's scope directory
    pub fn new(ctx: ExecContext, registry: R, supervisor: S, clock: C) -> Self {
        let store = DescriptorStore::for_context(&ctx);
        Self {
            ctx,
            store,
            registry,
            supervisor,
            clock,
            kill_policy: KillPolicy::default(),
        }
    }

    pub fn with_kill_policy(mut self, policy: KillPolicy) -> Self {
        self.kill_policy = policy;
        self
    }

    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// Resolve a package name to its service
    pub async fn service(&self, name: &str) -> Result<Service<'_, R, S, C>, ServiceError> {
        let package = self.registry.resolve(name).await?;
        if !package.installed {
            return Err(ServiceError::UnknownService(name.to_string()));
        }
        Ok(Service::new(self, package))
    }

    /// Resolve a supervisor label back to its service, if it maps to a known package
    pub async fn service_from_label(&self, label: &str) -> Option<Service<'_, R, S, C>> {
        let name = label::name_from_label(label)?;
        match self.service(name).await {
            Ok(service) => Some(service),
            Err(e) => {
                log::debug!("Label {} does not resolve: {}", label, e);
                None
            }
        }
    }
}
