use pretty_assertions::assert_eq;
use watch_engine::{select_fragments, FailureKind};

const PAGE: &str = r#"<html><head><title>Shop</title></head><body>
<h1> Spring sale </h1>
<p class="price"> 10 EUR </p>
<p class="price">12 <b>EUR</b></p>
<div id="stock">In stock</div>
</body></html>"#;

#[test]
fn class_selector_returns_trimmed_text_in_document_order() {
    let fragments = select_fragments(PAGE, ".price").unwrap();
    assert_eq!(fragments, vec!["10 EUR".to_string(), "12 EUR".to_string()]);
}

#[test]
fn id_and_tag_selectors_match() {
    assert_eq!(select_fragments(PAGE, "#stock").unwrap(), vec!["In stock"]);
    assert_eq!(select_fragments(PAGE, "h1").unwrap(), vec!["Spring sale"]);
}

#[test]
fn no_match_is_empty_not_an_error() {
    assert!(select_fragments(PAGE, ".missing").unwrap().is_empty());
}

#[test]
fn malformed_selector_is_reported() {
    let err = select_fragments(PAGE, ".").unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidSelector);
}
