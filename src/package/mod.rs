//! Package registry
//!
//! Resolves a package name to the metadata a service needs: whether it is
//! installed, where its files live, the values templates may reference, and
//! the package's own template, if it ships one.

mod manifest;

pub use manifest::{load_manifest, parse_manifest, Manifest, ManifestError};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::label;
use crate::template::TemplateSource;

/// Manifest file inside a package's opt prefix
pub const MANIFEST_FILE: &str = "service.manifest";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No available package with the name \"{0}\"")]
    NotInstalled(String),

    #[error("Invalid package name \"{0}\"")]
    InvalidName(String),

    #[error("Bad manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },
}

/// Installed package metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub installed: bool,
    /// Stable install location (`<prefix>/opt/<name>`)
    pub opt_prefix: PathBuf,
    /// Declared user to run as
    pub startup_user: Option<String>,
    /// Template the package provides itself
    pub template: Option<TemplateSource>,
    /// Values for `{{name}}` placeholders
    pub attributes: BTreeMap<String, String>,
}

impl Package {
    pub fn new(name: impl Into<String>, opt_prefix: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            installed: true,
            opt_prefix: opt_prefix.into(),
            startup_user: None,
            template: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_startup_user(mut self, user: impl Into<String>) -> Self {
        self.startup_user = Some(user.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Where an installed package drops a ready-made descriptor
    pub fn conventional_template_path(&self) -> PathBuf {
        self.opt_prefix
            .join(label::file_name(&label::label_for(&self.name)))
    }
}

/// Name -> package resolution
#[allow(async_fn_in_trait)]
pub trait Registry {
    async fn resolve(&self, name: &str) -> Result<Package, RegistryError>;
}

/// Registry backed by a Homebrew-style prefix: `<prefix>/opt/<name>` per package
#[derive(Debug, Clone)]
pub struct KegRegistry {
    prefix: PathBuf,
}

impl KegRegistry {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn opt_prefix(&self, name: &str) -> PathBuf {
        self.prefix.join("opt").join(name)
    }

    /// Values every package exposes to templates
    fn builtin_attributes(&self, name: &str, opt: &Path) -> BTreeMap<String, String> {
        let show = |p: PathBuf| p.to_string_lossy().into_owned();
        let mut attrs = BTreeMap::new();
        attrs.insert("name".to_string(), name.to_string());
        attrs.insert("plist_name".to_string(), label::label_for(name));
        attrs.insert("HOMEBREW_PREFIX".to_string(), show(self.prefix.clone()));
        attrs.insert("opt_prefix".to_string(), show(opt.to_path_buf()));
        for dir in ["bin", "sbin", "lib", "libexec", "share", "include"] {
            attrs.insert(dir.to_string(), show(opt.join(dir)));
        }
        attrs.insert("etc".to_string(), show(self.prefix.join("etc")));
        attrs.insert("var".to_string(), show(self.prefix.join("var")));
        attrs
    }

    fn manifest_template(&self, opt: &Path, raw: &str) -> TemplateSource {
        match TemplateSource::from_arg(raw) {
            TemplateSource::FilePath(path) if path.is_relative() => {
                TemplateSource::FilePath(opt.join(path))
            }
            other => other,
        }
    }
}

impl Registry for KegRegistry {
    async fn resolve(&self, name: &str) -> Result<Package, RegistryError> {
        if name.is_empty() || name.contains('/') || name.starts_with('.') {
            return Err(RegistryError::InvalidName(name.to_string()));
        }

        let opt = self.opt_prefix(name);
        if !tokio::fs::try_exists(&opt).await.unwrap_or(false) {
            return Err(RegistryError::NotInstalled(name.to_string()));
        }

        let mut package = Package::new(name, opt.clone());
        package.attributes = self.builtin_attributes(name, &opt);

        let manifest_path = opt.join(MANIFEST_FILE);
        let manifest = load_manifest(&manifest_path)
            .await
            .map_err(|source| RegistryError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        if let Some(manifest) = manifest {
            log::debug!("Loaded manifest for {}", name);
            package.startup_user = manifest.startup_user;
            package.template = manifest
                .template
                .as_deref()
                .map(|raw| self.manifest_template(&opt, raw));
            package.attributes.extend(manifest.attributes);
        }

        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(prefix: &Path, name: &str) -> PathBuf {
        let opt = prefix.join("opt").join(name);
        std::fs::create_dir_all(&opt).unwrap();
        opt
    }

    #[tokio::test]
    async fn test_resolve_installed() {
        let tmp = tempfile::tempdir().unwrap();
        let opt = install(tmp.path(), "widget");
        let registry = KegRegistry::new(tmp.path());

        let package = registry.resolve("widget").await.unwrap();
        assert!(package.installed);
        assert_eq!(package.opt_prefix, opt);
        assert_eq!(package.attributes["name"], "widget");
        assert_eq!(package.attributes["plist_name"], "homebrew.mxcl.widget");
        assert_eq!(package.attributes["bin"], opt.join("bin").to_string_lossy());
        assert_eq!(
            package.attributes["var"],
            tmp.path().join("var").to_string_lossy()
        );
        assert!(package.template.is_none());
        assert_eq!(
            package.conventional_template_path(),
            opt.join("homebrew.mxcl.widget.plist")
        );
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = KegRegistry::new(tmp.path());
        assert!(matches!(
            registry.resolve("ghost").await,
            Err(RegistryError::NotInstalled(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = KegRegistry::new(tmp.path());
        for name in ["", "../etc", "a/b", ".hidden"] {
            assert!(matches!(
                registry.resolve(name).await,
                Err(RegistryError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_manifest_applied() {
        let tmp = tempfile::tempdir().unwrap();
        let opt = install(tmp.path(), "widget");
        std::fs::write(
            opt.join(MANIFEST_FILE),
            "[Service]\nStartupUser=_widget\nTemplate=share/widget.plist\n\n[Attributes]\nport=8080\nbin=/custom/bin\n",
        )
        .unwrap();

        let package = KegRegistry::new(tmp.path()).resolve("widget").await.unwrap();
        assert_eq!(package.startup_user.as_deref(), Some("_widget"));
        assert_eq!(
            package.template,
            Some(TemplateSource::FilePath(opt.join("share/widget.plist")))
        );
        assert_eq!(package.attributes["port"], "8080");
        // Manifest overrides builtins
        assert_eq!(package.attributes["bin"], "/custom/bin");
    }

    #[tokio::test]
    async fn test_manifest_remote_template() {
        let tmp = tempfile::tempdir().unwrap();
        let opt = install(tmp.path(), "widget");
        std::fs::write(
            opt.join(MANIFEST_FILE),
            "[Service]\nTemplate=https://example.com/widget.plist\n",
        )
        .unwrap();

        let package = KegRegistry::new(tmp.path()).resolve("widget").await.unwrap();
        assert_eq!(
            package.template,
            Some(TemplateSource::RemoteUrl("https://example.com/widget.plist".into()))
        );
    }

    #[tokio::test]
    async fn test_bad_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let opt = install(tmp.path(), "widget");
        std::fs::write(opt.join(MANIFEST_FILE), "[Service]\nBogus=1\n").unwrap();

        assert!(matches!(
            KegRegistry::new(tmp.path()).resolve("widget").await,
            Err(RegistryError::Manifest { .. })
        ));
    }
}
