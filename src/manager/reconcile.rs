//! Listing and cleanup: compare supervisor registrations with descriptor files

use std::path::PathBuf;

use serde::Serialize;

use super::{Clock, Manager, ServiceError};
use crate::label;
use crate::package::Registry;
use crate::supervisor::Supervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    /// Registered and backed by a descriptor
    Started,
    /// Registered, descriptor missing
    Stale,
    /// Label does not map to an installed package
    Unknown,
}

impl ListStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Stale => "stale",
            Self::Unknown => "unknown",
        }
    }
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub name: String,
    pub label: String,
    pub status: ListStatus,
    pub pid: Option<u32>,
    /// Descriptor path, when one exists
    pub path: Option<PathBuf>,
}

/// What `cleanup` did
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Stale registrations force-removed
    pub killed: Vec<String>,
    /// Orphaned descriptor files deleted
    pub removed: Vec<PathBuf>,
    /// Stale registrations that could not be removed
    pub failed: Vec<(String, ServiceError)>,
}

impl CleanupReport {
    /// Nothing was cleaned or attempted
    pub fn is_empty(&self) -> bool {
        self.killed.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }

    pub fn cleaned(&self) -> usize {
        self.killed.len() + self.removed.len()
    }
}

impl<R: Registry, S: Supervisor, C: Clock> Manager<R, S, C> {
    /// Every registration carrying our prefix, classified
    pub async fn list(&self) -> Vec<ListEntry> {
        let mut entries = Vec::new();

        for registration in self.supervisor.list().await {
            let label = registration.label;
            let name = label::name_from_label(&label).unwrap_or(&label).to_string();

            let entry = match self.service_from_label(&label).await {
                Some(service) => {
                    let exists = service.descriptor_exists();
                    ListEntry {
                        name,
                        status: if exists { ListStatus::Started } else { ListStatus::Stale },
                        pid: registration.pid,
                        path: exists.then(|| service.path().to_path_buf()),
                        label: label.clone(),
                    }
                }
                None => {
                    let path = self.store.resolve_path(&label);
                    ListEntry {
                        name,
                        status: ListStatus::Unknown,
                        pid: registration.pid,
                        path: self.store.exists(&path).then_some(path),
                        label: label.clone(),
                    }
                }
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Kill stale registrations, then delete descriptor files nothing has loaded
    pub async fn cleanup(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for label in self.supervisor.list_labels().await {
            let Some(service) = self.service_from_label(&label).await else {
                log::warn!("Skipping {}: not an installed package", label);
                continue;
            };
            if service.descriptor_exists() {
                continue;
            }

            log::debug!("{} is stale, removing", label);
            match service.kill().await {
                Ok(()) => report.killed.push(label),
                Err(e) => report.failed.push((label, e)),
            }
        }

        let loaded = self.supervisor.list_labels().await;
        for (label, path) in self.store.descriptors() {
            if loaded.contains(&label) {
                continue;
            }
            log::debug!("{} is not loaded, removing {}", label, path.display());
            self.store.remove(&path);
            if !self.store.exists(&path) {
                report.removed.push(path);
            }
        }

        report
    }
}
