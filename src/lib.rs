//! Click-to-sort behaviour for rendered HTML tables.
//!
//! A [`Page`] owns a parsed document. Decorating a table binds every
//! header cell to a column of that table; clicking a header re-orders the
//! body rows by the text of that column, alternating ascending and
//! descending on repeated clicks.
//!
//! ```
//! use sortable_table::Page;
//!
//! # fn main() -> sortable_table::Result<()> {
//! let mut page = Page::from_html(
//!     r#"<table id="fruit">
//!          <tr><th>id</th><th>name</th></tr>
//!          <tr><td>1</td><td>banana</td></tr>
//!          <tr><td>2</td><td>apple</td></tr>
//!          <tr><td>3</td><td>cherry</td></tr>
//!        </table>"#,
//! )?;
//! page.decorate_table_by_id("fruit")?;
//! page.click("#fruit th:nth-child(2)")?;
//! page.assert_column("#fruit", 1, &["apple", "banana", "cherry"])?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;

mod config;
mod dom;
mod html;
mod page;
mod runtime_state;
mod selector;
mod sortable;

#[cfg(test)]
mod tests;

pub use config::{PageConfig, SortOptions};
pub use page::Page;
pub use sortable::{SortDirection, SortableTable};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("missing element: {0}")]
    MissingElement(String),
    #[error("malformed row {row} in {table}: no cell at column {column}")]
    MalformedRow {
        table: String,
        row: usize,
        column: usize,
    },
    #[error("dom error: {0}")]
    Dom(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

/// Handle to a node inside a [`Page`]'s document.
///
/// Handles stay valid for the lifetime of the page; moving a node in the
/// tree keeps its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

#[derive(Debug, Clone)]
struct Element {
    tag_name: String,
    attrs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, Vec<NodeId>>,
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
