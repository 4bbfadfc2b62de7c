//! Supervisor gateway
//!
//! The only code that talks to launchd. Commands succeed iff `launchctl`
//! exits 0; its output is only read for `list`, and a failed enumeration
//! means "nothing registered".

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::label;

/// Default supervisor binary
pub const LAUNCHCTL: &str = "launchctl";

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}", .code.map_or("a signal".to_string(), |c| format!("status {}", c)))]
    Exit { command: String, code: Option<i32> },
}

/// One row of the supervisor's enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub label: String,
    /// Running process, if any
    pub pid: Option<u32>,
    /// Last exit status reported by launchd
    pub status: Option<i32>,
}

/// Operations against the service supervisor
#[allow(async_fn_in_trait)]
pub trait Supervisor {
    /// Registrations carrying our label prefix
    async fn list(&self) -> Vec<Registration>;

    /// Register the descriptor at `path`
    async fn load(&self, path: &Path) -> Result<(), SupervisorError>;

    /// Unregister the descriptor at `path`
    async fn unload(&self, path: &Path) -> Result<(), SupervisorError>;

    /// Drop a registration by label, for when there is no file to unload
    async fn remove(&self, label: &str) -> Result<(), SupervisorError>;

    async fn list_labels(&self) -> BTreeSet<String> {
        self.list().await.into_iter().map(|r| r.label).collect()
    }

    async fn pid_of(&self, label: &str) -> Option<u32> {
        self.list()
            .await
            .into_iter()
            .find(|r| r.label == label)
            .and_then(|r| r.pid)
    }
}

/// Parse `launchctl list` output, keeping only our labels
///
/// ```text
/// PID	Status	Label
/// 412	0	homebrew.mxcl.redis
/// -	78	homebrew.mxcl.nginx
/// ```
pub fn parse_list(output: &str) -> Vec<Registration> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let pid = fields.next()?;
            let status = fields.next()?;
            let label = fields.next()?;
            if !label::is_managed(label) {
                return None;
            }
            Some(Registration {
                label: label.to_string(),
                pid: pid.parse().ok(),
                status: status.parse().ok(),
            })
        })
        .collect()
}

/// `launchctl` subprocess gateway
#[derive(Debug, Clone)]
pub struct Launchctl {
    program: PathBuf,
}

impl Default for Launchctl {
    fn default() -> Self {
        Self::new(LAUNCHCTL)
    }
}

impl Launchctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Honour `BREW_SERVICES_LAUNCHCTL` if set
    pub fn from_env() -> Self {
        match std::env::var_os("BREW_SERVICES_LAUNCHCTL") {
            Some(program) if !program.is_empty() => Self::new(program),
            _ => Self::default(),
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program.display(), args.join(" "))
    }

    async fn run(&self, args: &[&str]) -> Result<(), SupervisorError> {
        let command = self.describe(args);
        log::debug!("Running {}", command);

        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| SupervisorError::Spawn {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SupervisorError::Exit {
                command,
                code: status.code(),
            })
        }
    }
}

impl Supervisor for Launchctl {
    async fn list(&self) -> Vec<Registration> {
        let output = Command::new(&self.program)
            .arg("list")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => parse_list(&String::from_utf8_lossy(&out.stdout)),
            Ok(out) => {
                log::debug!("{} list exited with {}", self.program.display(), out.status);
                Vec::new()
            }
            Err(e) => {
                log::warn!("Failed to run {} list: {}", self.program.display(), e);
                Vec::new()
            }
        }
    }

    async fn load(&self, path: &Path) -> Result<(), SupervisorError> {
        self.run(&["load", "-w", &path.to_string_lossy()]).await
    }

    async fn unload(&self, path: &Path) -> Result<(), SupervisorError> {
        self.run(&["unload", "-w", &path.to_string_lossy()]).await
    }

    async fn remove(&self, label: &str) -> Result<(), SupervisorError> {
        self.run(&["remove", label]).await
    }
}
