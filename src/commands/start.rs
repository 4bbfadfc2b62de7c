//! Start services

use brew_services::TemplateSource;

use super::BrewManager;

pub async fn start(
    manager: &BrewManager,
    names: Vec<String>,
    template: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (names, template) = split_template(names, template);
    let template = template.as_deref().map(TemplateSource::from_arg);

    let outcomes = manager.start_all(&names, template.as_ref()).await?;
    super::report(&outcomes, "started")
}

/// `start foo ./foo.plist` passes the template positionally
fn split_template(mut names: Vec<String>, template: Option<String>) -> (Vec<String>, Option<String>) {
    let template = match template {
        Some(arg) => Some(arg),
        None if names.len() == 2 && TemplateSource::looks_like_source(&names[1]) => names.pop(),
        None => None,
    };
    (names, template)
}
