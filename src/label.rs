//! Service labels
//!
//! Every managed service is known to launchd as `homebrew.mxcl.<name>`, and
//! its descriptor lives in `<scope-dir>/homebrew.mxcl.<name>.plist`. The
//! reserved prefix is what separates our entries from everything else the
//! supervisor reports.

/// Reserved label namespace
pub const NAMESPACE: &str = "homebrew.mxcl";

/// Descriptor file extension
pub const EXTENSION: &str = "plist";

/// Label for a package name
pub fn label_for(name: &str) -> String {
    format!("{}.{}", NAMESPACE, name)
}

/// Reverse a label into its package name, if it carries our prefix
pub fn name_from_label(label: &str) -> Option<&str> {
    label
        .strip_prefix(NAMESPACE)
        .and_then(|rest| rest.strip_prefix('.'))
        .filter(|name| !name.is_empty())
}

/// True if the supervisor entry is one of ours
pub fn is_managed(label: &str) -> bool {
    name_from_label(label).is_some()
}

/// Descriptor file name for a label
pub fn file_name(label: &str) -> String {
    format!("{}.{}", label, EXTENSION)
}

/// Label encoded in a descriptor file name (`homebrew.mxcl.foo.plist` -> `homebrew.mxcl.foo`)
pub fn label_from_file_name(file_name: &str) -> Option<&str> {
    let label = file_name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    is_managed(label).then_some(label)
}
