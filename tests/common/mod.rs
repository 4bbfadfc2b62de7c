//! Shared fixtures: in-memory supervisor, map-backed registry, instant clock

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use brew_services::package::RegistryError;
use brew_services::supervisor::SupervisorError;
use brew_services::{
    Clock, ExecContext, KillPolicy, Manager, Package, Registration, Registry, Supervisor,
    TemplateSource,
};

pub const TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Label</key>
	<string>placeholder</string>
	<key>ProgramArguments</key>
	<array>
		<string>{{bin}}/{{name}}</string>
	</array>
	<key>RunAtLoad</key>
	<true/>
</dict>
</plist>
"#;

/// launchd stand-in. Loading a descriptor registers the label named by its file.
#[derive(Default)]
pub struct FakeSupervisor {
    registered: RefCell<BTreeMap<String, Option<u32>>>,
    /// label -> list calls left before a removal takes effect
    pending: RefCell<BTreeMap<String, u32>>,
    next_pid: Cell<u32>,
    calls: RefCell<Vec<String>>,
    pub fail_load: Cell<bool>,
    pub fail_unload: Cell<bool>,
    pub fail_remove: Cell<bool>,
    /// `remove` reports success but the label never goes away
    pub sticky: Cell<bool>,
    /// `remove` takes effect after this many `list` calls
    pub linger: Cell<u32>,
}

impl FakeSupervisor {
    pub fn register(&self, label: &str, pid: Option<u32>) {
        self.registered.borrow_mut().insert(label.to_string(), pid);
    }

    pub fn is_registered(&self, label: &str) -> bool {
        self.registered.borrow().contains_key(label)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn exit(command: String) -> SupervisorError {
        SupervisorError::Exit {
            command,
            code: Some(1),
        }
    }
}

fn label_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Supervisor for FakeSupervisor {
    async fn list(&self) -> Vec<Registration> {
        let mut done = Vec::new();
        for (label, left) in self.pending.borrow_mut().iter_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                done.push(label.clone());
            }
        }
        for label in done {
            self.pending.borrow_mut().remove(&label);
            self.registered.borrow_mut().remove(&label);
        }

        self.registered
            .borrow()
            .iter()
            .map(|(label, pid)| Registration {
                label: label.clone(),
                pid: *pid,
                status: Some(0),
            })
            .collect()
    }

    async fn load(&self, path: &Path) -> Result<(), SupervisorError> {
        let label = label_of(path);
        self.record(format!("load {}", label));
        if self.fail_load.get() || !path.is_file() {
            return Err(Self::exit(format!("launchctl load -w {}", path.display())));
        }
        let pid = self.next_pid.get() + 1000;
        self.next_pid.set(self.next_pid.get() + 1);
        self.register(&label, Some(pid));
        Ok(())
    }

    async fn unload(&self, path: &Path) -> Result<(), SupervisorError> {
        let label = label_of(path);
        self.record(format!("unload {}", label));
        if self.fail_unload.get() || self.registered.borrow_mut().remove(&label).is_none() {
            return Err(Self::exit(format!("launchctl unload -w {}", path.display())));
        }
        Ok(())
    }

    async fn remove(&self, label: &str) -> Result<(), SupervisorError> {
        self.record(format!("remove {}", label));
        if self.fail_remove.get() || !self.is_registered(label) {
            return Err(Self::exit(format!("launchctl remove {}", label)));
        }
        if self.sticky.get() {
            return Ok(());
        }
        match self.linger.get() {
            0 => {
                self.registered.borrow_mut().remove(label);
            }
            n => {
                self.pending.borrow_mut().insert(label.to_string(), n);
            }
        }
        Ok(())
    }
}

/// Registry over a fixed set of packages
#[derive(Default)]
pub struct MapRegistry {
    packages: BTreeMap<String, Package>,
}

impl MapRegistry {
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        Self {
            packages: packages.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }
}

impl Registry for MapRegistry {
    async fn resolve(&self, name: &str) -> Result<Package, RegistryError> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotInstalled(name.to_string()))
    }
}

/// Counts sleeps instead of sleeping
#[derive(Clone, Default)]
pub struct InstantClock {
    pub sleeps: Rc<Cell<u32>>,
}

impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

pub type TestManager = Manager<MapRegistry, FakeSupervisor, InstantClock>;

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub clock: InstantClock,
    pub manager: TestManager,
}

impl Harness {
    pub fn prefix(&self) -> PathBuf {
        self.dir.path().join("prefix")
    }

    pub fn scope_dir(&self) -> PathBuf {
        self.dir.path().join("home/Library/LaunchAgents")
    }

    pub fn supervisor(&self) -> &FakeSupervisor {
        self.manager.supervisor()
    }

    /// Drop a file into the scope directory
    pub fn write_descriptor(&self, label: &str, content: &str) -> PathBuf {
        std::fs::create_dir_all(self.scope_dir()).unwrap();
        let path = self.scope_dir().join(format!("{}.plist", label));
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// Package with an inline template under `<root>/prefix/opt/<name>`
pub fn package(root: &Path, name: &str) -> Package {
    let opt = root.join("prefix/opt").join(name);
    Package::new(name, opt.clone())
        .with_template(TemplateSource::Inline(TEMPLATE.to_string()))
        .with_attribute("name", name)
        .with_attribute("bin", opt.join("bin").to_string_lossy())
}

/// Unprivileged manager for `alice`, with the named packages installed
pub fn harness(names: &[&str]) -> Harness {
    harness_with(|root| names.iter().map(|n| package(root, n)).collect())
}

pub fn harness_with(packages: impl FnOnce(&Path) -> Vec<Package>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ExecContext::new(
        false,
        "alice",
        dir.path().join("home"),
        dir.path().join("prefix"),
    );
    let clock = InstantClock::default();
    let registry = MapRegistry::new(packages(dir.path()));
    let manager = Manager::new(ctx, registry, FakeSupervisor::default(), clock.clone())
        .with_kill_policy(KillPolicy {
            attempts: 5,
            interval: Duration::from_millis(10),
        });

    Harness {
        dir,
        clock,
        manager,
    }
}
