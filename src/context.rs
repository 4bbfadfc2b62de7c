//! Execution context
//!
//! Privilege, acting user, and the directories derived from them. Resolved
//! once in `main` and passed down; nothing below reads the process
//! environment on its own.

use std::path::{Path, PathBuf};

/// Shared descriptor directory used when running elevated
pub const DAEMONS_DIR: &str = "/Library/LaunchDaemons";

/// Per-user descriptor directory, relative to the home directory
pub const AGENTS_DIR: &str = "Library/LaunchAgents";

/// Name of the elevated user
pub const ROOT_USER: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("HOMEBREW_PREFIX is not set; brew-services must be run from a Homebrew environment")]
    NoPrefix,

    #[error("Could not determine the home directory")]
    NoHome,
}

/// Who we are running as and where descriptors go
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Effective uid is 0
    pub privileged: bool,
    /// Acting user name (the invoking user under sudo)
    pub user: String,
    /// Home directory of the acting process
    pub home: PathBuf,
    /// Package registry root
    pub prefix: PathBuf,
    /// Directory holding our descriptors
    pub scope_dir: PathBuf,
}

impl ExecContext {
    pub fn new(privileged: bool, user: impl Into<String>, home: PathBuf, prefix: PathBuf) -> Self {
        let scope_dir = scope_dir_for(privileged, &home);
        Self {
            privileged,
            user: user.into(),
            home,
            prefix,
            scope_dir,
        }
    }

    /// Resolve the context from the running process
    pub fn from_env() -> Result<Self, ContextError> {
        let prefix = std::env::var_os("HOMEBREW_PREFIX")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(ContextError::NoPrefix)?;
        let home = dirs::home_dir().ok_or(ContextError::NoHome)?;

        let euid = nix::unistd::geteuid();
        let privileged = euid.is_root();
        let user = resolve_user(privileged, euid);
        log::debug!(
            "Context: user={} privileged={} prefix={}",
            user,
            privileged,
            prefix.display()
        );

        Ok(Self::new(privileged, user, home, prefix))
    }

    /// The acting user is root itself (not a sudo'ing user)
    pub fn is_root_user(&self) -> bool {
        self.user == ROOT_USER
    }
}

/// Descriptor directory for a privilege level
pub fn scope_dir_for(privileged: bool, home: &Path) -> PathBuf {
    if privileged {
        PathBuf::from(DAEMONS_DIR)
    } else {
        home.join(AGENTS_DIR)
    }
}

fn resolve_user(privileged: bool, euid: nix::unistd::Uid) -> String {
    if privileged {
        if let Some(sudo_user) = std::env::var("SUDO_USER").ok().filter(|u| !u.is_empty()) {
            return sudo_user;
        }
    }

    match nix::unistd::User::from_uid(euid) {
        Ok(Some(user)) => user.name,
        Ok(None) | Err(_) => std::env::var("USER").unwrap_or_else(|_| {
            if privileged {
                ROOT_USER.to_string()
            } else {
                euid.to_string()
            }
        }),
    }
}
