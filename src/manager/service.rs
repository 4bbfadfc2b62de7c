//! A package bound to its launchd label and descriptor path

use std::path::{Path, PathBuf};

use super::{Clock, Manager, ServiceError, ServiceState};
use crate::label;
use crate::package::{Package, Registry};
use crate::supervisor::Supervisor;
use crate::template::{self, RenderInput, TemplateSource};

/// View of one managed service. Built on demand, never persisted.
pub struct Service<'m, R, S, C> {
    manager: &'m Manager<R, S, C>,
    package: Package,
    label: String,
    path: PathBuf,
}

impl<'m, R: Registry, S: Supervisor, C: Clock> Service<'m, R, S, C> {
    pub(super) fn new(manager: &'m Manager<R, S, C>, package: Package) -> Self {
        let label = label::label_for(&package.name);
        let path = manager.store.resolve_path(&label);
        Self {
            manager,
            package,
            label,
            path,
        }
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Destination of the descriptor file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Registered with the supervisor right now
    pub async fn is_loaded(&self) -> bool {
        self.manager
            .supervisor
            .list_labels()
            .await
            .contains(&self.label)
    }

    pub async fn pid(&self) -> Option<u32> {
        self.manager.supervisor.pid_of(&self.label).await
    }

    pub fn descriptor_exists(&self) -> bool {
        self.manager.store.exists(&self.path)
    }

    pub async fn state(&self) -> ServiceState {
        ServiceState::from_observed(self.is_loaded().await, self.descriptor_exists())
    }

    fn transition(&self, from: ServiceState, to: ServiceState) {
        log::debug!("{}: {} -> {}", self.label, from, to);
    }

    /// Render, write, and register the descriptor. Returns the label used.
    ///
    /// Template precedence: `custom`, then the package's conventional
    /// `.plist`, then the package's own template.
    pub async fn start(&self, custom: Option<&TemplateSource>) -> Result<&str, ServiceError> {
        let state = self.state().await;
        if state.is_loaded() {
            return Err(ServiceError::AlreadyRunning(self.name().to_string()));
        }
        self.transition(state, ServiceState::Starting);

        let source = self.template_source(custom).await?;
        let raw = source.materialize().await?;
        let content = template::render(
            &raw,
            &RenderInput {
                label: &self.label,
                attributes: &self.package.attributes,
                startup_user: self.package.startup_user.as_deref(),
            },
            &self.manager.ctx,
        );

        self.manager.store.write(&self.path, &content)?;

        // The descriptor stays on disk if registration fails
        self.manager
            .supervisor
            .load(&self.path)
            .await
            .map_err(|source| ServiceError::StartFailed {
                name: self.name().to_string(),
                source,
            })?;

        self.transition(ServiceState::Starting, ServiceState::Registered);
        log::info!("Started {} ({})", self.name(), self.label);
        Ok(&self.label)
    }

    async fn template_source(
        &self,
        custom: Option<&TemplateSource>,
    ) -> Result<TemplateSource, ServiceError> {
        if let Some(custom) = custom {
            return Ok(custom.clone());
        }

        let conventional = self.package.conventional_template_path();
        if tokio::fs::try_exists(&conventional).await.unwrap_or(false) {
            return Ok(TemplateSource::FilePath(conventional));
        }

        self.package
            .template
            .clone()
            .ok_or_else(|| ServiceError::TemplateUnavailable(self.name().to_string()))
    }

    /// Unregister the service and remove its descriptor.
    ///
    /// A stale registration (no file to unload) is killed by label instead.
    /// When not loaded, a leftover descriptor is still removed before
    /// reporting `NotRunning`.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        let state = self.state().await;
        match state {
            ServiceState::Registered => {
                self.transition(state, ServiceState::Stopping);
                self.manager
                    .supervisor
                    .unload(&self.path)
                    .await
                    .map_err(|source| ServiceError::StopFailed {
                        name: self.name().to_string(),
                        source,
                    })?;
            }
            ServiceState::Stale => {
                self.transition(state, ServiceState::Stopping);
                self.kill().await?;
            }
            _ => {
                self.manager.store.remove(&self.path);
                return Err(ServiceError::NotRunning(self.name().to_string()));
            }
        }

        self.manager.store.remove(&self.path);
        self.transition(ServiceState::Stopping, ServiceState::Unregistered);
        log::info!("Stopped {}", self.name());
        Ok(())
    }

    /// Stop if loaded, then start
    pub async fn restart(&self) -> Result<&str, ServiceError> {
        if self.is_loaded().await {
            match self.stop().await {
                Ok(()) | Err(ServiceError::NotRunning(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.start(None).await
    }

    /// Force-remove the registration by label and wait until the supervisor
    /// no longer reports it
    pub async fn kill(&self) -> Result<(), ServiceError> {
        self.manager
            .supervisor
            .remove(&self.label)
            .await
            .map_err(|source| ServiceError::KillFailed {
                name: self.name().to_string(),
                source,
            })?;

        let policy = self.manager.kill_policy;
        let mut checks = 0;
        loop {
            checks += 1;
            if !self.is_loaded().await {
                log::debug!("{} gone after {} checks", self.label, checks);
                return Ok(());
            }
            if checks >= policy.attempts {
                return Err(ServiceError::TimedOut {
                    name: self.name().to_string(),
                    attempts: checks,
                });
            }
            self.manager.clock.sleep(policy.interval).await;
        }
    }
}
