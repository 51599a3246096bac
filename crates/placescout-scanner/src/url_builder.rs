use crate::error::{PipelineError, Result};

/// Build the search URL for a query and optional location.
///
/// The search text is `"<query> in <location>"` when a location is given,
/// form-encoded and substituted for `{query}` in the template.
pub fn build_search_url(template: &str, query: &str, location: Option<&str>) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "search query cannot be empty".to_string(),
        ));
    }

    if !template.contains("{query}") {
        return Err(PipelineError::InvalidConfig(format!(
            "search URL template has no {{query}} placeholder: {template}"
        )));
    }

    let text = match location.map(str::trim).filter(|l| !l.is_empty()) {
        Some(location) => format!("{query} in {location}"),
        None => query.to_string(),
    };

    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    Ok(template.replace("{query}", &encoded))
}
