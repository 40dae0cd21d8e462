/// Behaviour of a single decorated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    /// Leading body rows that stay in place and are never sorted.
    ///
    /// The result pages render their `th` row inside the (implied) body,
    /// so the default reserves one row.
    pub skip_leading_rows: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            skip_leading_rows: 1,
        }
    }
}

impl SortOptions {
    pub fn with_skip_leading_rows(mut self, rows: usize) -> Self {
        self.skip_leading_rows = rows;
        self
    }
}

/// Tables decorated by [`Page::on_load`](crate::Page::on_load).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub required_tables: Vec<String>,
    pub optional_tables: Vec<String>,
    pub sort: SortOptions,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            required_tables: vec!["tstTable".to_string()],
            optional_tables: vec!["tstTable2".to_string(), "tstTable3".to_string()],
            sort: SortOptions::default(),
        }
    }
}

impl PageConfig {
    /// A config that decorates nothing until tables are added.
    pub fn empty() -> Self {
        Self {
            required_tables: Vec::new(),
            optional_tables: Vec::new(),
            sort: SortOptions::default(),
        }
    }

    pub fn with_required(mut self, id: impl Into<String>) -> Self {
        self.required_tables.push(id.into());
        self
    }

    pub fn with_optional(mut self, id: impl Into<String>) -> Self {
        self.optional_tables.push(id.into());
        self
    }

    pub fn with_sort_options(mut self, sort: SortOptions) -> Self {
        self.sort = sort;
        self
    }
}
