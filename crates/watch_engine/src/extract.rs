use scraper::{Html, Selector};

use crate::{FailureKind, FetchError};

/// Text of every element matching `selector`, trimmed, in document order.
pub fn select_fragments(html: &str, selector: &str) -> Result<Vec<String>, FetchError> {
    let selector = Selector::parse(selector).map_err(|err| {
        FetchError::new(
            FailureKind::InvalidSelector,
            format!("cannot parse selector '{selector}': {err}"),
        )
    })?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect())
}
