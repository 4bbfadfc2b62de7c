//! Descriptor template rendering
//!
//! A template is launchd plist text with `{{name}}` placeholders. Rendering:
//!
//! 1. materialize the source (inline text, file, or URL)
//! 2. expand placeholders from the package's attribute map, one pass
//! 3. force the `Label` value to the service label
//! 4. reconcile `UserName` with the execution context

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::context::ExecContext;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z][A-Za-z0-9_]*)\}\}").unwrap());

static LABEL_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<key>Label</key>\s*)<string(?:\s*/>|>[^<]*</string>)").unwrap()
});

/// First dict in the document, open or empty
static DICT_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<dict(?:\s*/)?>").unwrap());

static USER_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<key>UserName</key>").unwrap());

static ROOT_USER_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<key>UserName</key>\s*<string>)root(</string>)").unwrap());

static PLIST_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</dict>\s*</plist>\s*$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch template {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// Where template text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Inline(String),
    FilePath(PathBuf),
    RemoteUrl(String),
}

impl TemplateSource {
    /// Interpret a command-line argument: URL if it has a scheme, otherwise a path
    pub fn from_arg(arg: &str) -> Self {
        if arg.contains("://") {
            Self::RemoteUrl(arg.to_string())
        } else {
            Self::FilePath(PathBuf::from(arg))
        }
    }

    /// Heuristic for a trailing positional argument that names a template
    pub fn looks_like_source(arg: &str) -> bool {
        arg.contains("://") || arg.contains('/') || arg.ends_with(".plist")
    }

    /// Produce the raw template text
    pub async fn materialize(&self) -> Result<String, TemplateError> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::FilePath(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| TemplateError::Read {
                        path: path.clone(),
                        source,
                    })
            }
            Self::RemoteUrl(url) => fetch(url).await,
        }
    }
}

async fn fetch(url: &str) -> Result<String, TemplateError> {
    log::debug!("Fetching template from {}", url);
    let owned = url.to_string();
    let result = tokio::task::spawn_blocking(move || -> Result<String, String> {
        let response = ureq::get(&owned).call().map_err(|e| e.to_string())?;
        response.into_string().map_err(|e| e.to_string())
    })
    .await;

    match result {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(reason)) => Err(TemplateError::Fetch {
            url: url.to_string(),
            reason,
        }),
        Err(join) => Err(TemplateError::Fetch {
            url: url.to_string(),
            reason: join.to_string(),
        }),
    }
}

/// Inputs that shape a rendered descriptor besides the template text
pub struct RenderInput<'a> {
    pub label: &'a str,
    pub attributes: &'a BTreeMap<String, String>,
    /// User the package asks to run as, if any
    pub startup_user: Option<&'a str>,
}

/// Render template text into final descriptor content
pub fn render(template: &str, input: &RenderInput<'_>, ctx: &ExecContext) -> String {
    let expanded = expand_placeholders(template, input.attributes);
    let labeled = force_label(&expanded, input.label);
    let user = input.startup_user.unwrap_or(&ctx.user);
    reconcile_user(&labeled, ctx, user)
}

/// Replace `{{name}}` with the attribute value, or nothing if unknown.
/// Substituted text is not scanned again.
pub fn expand_placeholders(template: &str, attributes: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            match attributes.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    log::debug!("Template placeholder {{{{{}}}}} has no value", &caps[1]);
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Overwrite (or insert) the `Label` value
pub fn force_label(content: &str, label: &str) -> String {
    let escaped = xml_escape(label);
    if LABEL_FIELD.is_match(content) {
        return LABEL_FIELD
            .replace_all(content, |caps: &Captures<'_>| {
                format!("{}<string>{}</string>", &caps[1], escaped)
            })
            .into_owned();
    }

    DICT_OPEN
        .replace(content, |caps: &Captures<'_>| {
            let field = format!("<dict>\n\t<key>Label</key>\n\t<string>{}</string>", escaped);
            if caps[0].ends_with("/>") {
                format!("{}\n</dict>", field)
            } else {
                field
            }
        })
        .into_owned()
}

/// Keep descriptors from running as root when a non-root user is acting
pub fn reconcile_user(content: &str, ctx: &ExecContext, user: &str) -> String {
    if ctx.is_root_user() {
        return content.to_string();
    }
    let escaped = xml_escape(user);

    if ROOT_USER_FIELD.is_match(content) {
        log::debug!("Rewriting UserName root -> {}", user);
        return ROOT_USER_FIELD
            .replace_all(content, |caps: &Captures<'_>| {
                format!("{}{}{}", &caps[1], escaped, &caps[2])
            })
            .into_owned();
    }

    if ctx.privileged && !USER_KEY.is_match(content) {
        log::debug!("Injecting UserName {}", user);
        return PLIST_CLOSE
            .replace(content, |caps: &Captures<'_>| {
                format!("\t<key>UserName</key>\n\t<string>{}</string>\n{}", escaped, &caps[0])
            })
            .into_owned();
    }

    content.to_string()
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
