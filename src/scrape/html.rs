//! Structural-anchor lookups over a parsed status page.
//!
//! Firmware revisions shuffle the layout of the status page, so tables are
//! found by their header label rather than by position.

use crate::error::{ExporterError, Result};
use scraper::{ElementRef, Html, Selector};

/// Parse a response body. The HTML parser itself never rejects input, so an
/// empty body or one without any elements is the only document-level failure.
pub fn parse_document(body: &str) -> Result<Html> {
    if body.trim().is_empty() {
        return Err(ExporterError::html_error("empty document"));
    }
    let doc = Html::parse_document(body);
    let body_sel = selector("body *")?;
    if doc.select(&body_sel).next().is_none() {
        return Err(ExporterError::html_error("document has no content"));
    }
    Ok(doc)
}

/// Compile a CSS selector.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ExporterError::html_error(format!("bad selector {css:?}: {e}")))
}

/// Collapse the text content of an element into a single trimmed string.
pub fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `css`, if any.
pub fn first_text(doc: &Html, css: &str) -> Result<Option<String>> {
    let sel = selector(css)?;
    Ok(doc.select(&sel).next().map(text_of))
}

/// Find the table whose header cell reads exactly `label`.
pub fn find_table<'a>(doc: &'a Html, label: &str) -> Result<Option<ElementRef<'a>>> {
    let th = selector("th")?;
    let table = doc
        .select(&th)
        .find(|cell| text_of(*cell) == label)
        .and_then(enclosing_table);
    Ok(table)
}

/// Rows that belong directly to `table`, skipping rows of nested tables.
pub fn rows<'a>(table: ElementRef<'a>) -> Result<Vec<ElementRef<'a>>> {
    let tr = selector("tr")?;
    let rows = table
        .select(&tr)
        .filter(|row| enclosing_table(*row) == Some(table))
        .collect();
    Ok(rows)
}

/// Text of every `td` directly under `row`, in column order.
pub fn cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
        .map(text_of)
        .collect()
}

fn enclosing_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}
