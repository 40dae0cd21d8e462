use super::html::parse_html;
use super::runtime_state::{HandlerStore, HeaderBinding, TraceState};
use super::sortable::body_rows;
use super::*;

/// A parsed document plus the sort behaviour attached to its tables.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) config: PageConfig,
    pub(crate) tables: Vec<SortableTable>,
    pub(crate) handlers: HandlerStore,
    pub(crate) trace_state: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, PageConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: PageConfig) -> Result<Self> {
        stacker::grow(32 * 1024 * 1024, || Self::from_html_impl(html, config))
    }

    fn from_html_impl(html: &str, config: PageConfig) -> Result<Self> {
        let dom = parse_html(html)?;
        log::debug!("parsed page with {} nodes", dom.nodes.len());
        Ok(Self {
            dom,
            config,
            tables: Vec::new(),
            handlers: HandlerStore::default(),
            trace_state: TraceState::default(),
        })
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn table_by_id(&self, id: &str) -> Result<NodeId> {
        let node = self
            .dom
            .by_id(id)
            .ok_or_else(|| Error::MissingElement(format!("#{id}")))?;
        if !self.dom.has_tag(node, "table") {
            return Err(Error::MissingElement(format!("#{id} is not a <table>")));
        }
        Ok(node)
    }

    pub fn is_decorated(&self, table: NodeId) -> bool {
        self.tables.iter().any(|sortable| sortable.table() == table)
    }

    pub fn decorated_tables(&self) -> &[SortableTable] {
        &self.tables
    }

    /// Binds every header cell of `table` to its column, using the page's
    /// sort options. Decorating a table that is already decorated does
    /// nothing.
    pub fn decorate_table(&mut self, table: NodeId) -> Result<()> {
        let options = self.config.sort;
        self.decorate_table_with(table, options)
    }

    pub fn decorate_table_with(&mut self, table: NodeId, options: SortOptions) -> Result<()> {
        if self.is_decorated(table) {
            log::debug!("table node {} already decorated", table.0);
            return Ok(());
        }

        let sortable = SortableTable::attach(&self.dom, table, options)?;
        let table_slot = self.tables.len();
        for (column, header) in sortable.headers().iter().enumerate() {
            self.handlers
                .bind(*header, HeaderBinding { table_slot, column });
        }
        self.trace_state.line(format!(
            "[decorate] {} headers={}",
            sortable.label(),
            sortable.headers().len()
        ));
        log::debug!(
            "decorated {} with {} sortable columns ({} headers bound on page)",
            sortable.label(),
            sortable.headers().len(),
            self.handlers.len()
        );
        self.tables.push(sortable);
        Ok(())
    }

    pub fn decorate_table_by_id(&mut self, id: &str) -> Result<()> {
        let table = self.table_by_id(id)?;
        self.decorate_table(table)
    }

    /// Decorates `#id` when the page has it. Returns whether it exists.
    pub fn decorate_optional_table(&mut self, id: &str) -> Result<bool> {
        if self.dom.by_id(id).is_none() {
            log::debug!("optional table #{id} not on page");
            return Ok(false);
        }
        self.decorate_table_by_id(id)?;
        Ok(true)
    }

    /// Page-load hook: decorates the tables named by the page's config.
    pub fn on_load(&mut self) -> Result<()> {
        let config = self.config.clone();
        self.on_load_with(&config)
    }

    pub fn on_load_with(&mut self, config: &PageConfig) -> Result<()> {
        for id in &config.required_tables {
            let table = self.table_by_id(id)?;
            self.decorate_table_with(table, config.sort)?;
        }
        for id in &config.optional_tables {
            if self.dom.by_id(id).is_none() {
                log::debug!("optional table #{id} not on page");
                continue;
            }
            let table = self.table_by_id(id)?;
            self.decorate_table_with(table, config.sort)?;
        }
        Ok(())
    }

    /// Direction the next click on `column` of `table` applies, or `None`
    /// when the table is not decorated.
    pub fn sort_direction(&self, table: NodeId, column: usize) -> Option<SortDirection> {
        self.tables
            .iter()
            .find(|sortable| sortable.table() == table)
            .map(|sortable| sortable.next_direction(column))
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    /// Delivers a click at `target`. The click bubbles up the tree and the
    /// nearest bound header cell sorts its column.
    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        stacker::grow(32 * 1024 * 1024, || self.click_node_impl(target))
    }

    fn click_node_impl(&mut self, target: NodeId) -> Result<()> {
        if !self.dom.is_valid_node(target) {
            return Err(Error::Dom(format!("unknown node {}", target.0)));
        }

        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if let Some(binding) = self.handlers.get(node) {
                return self.run_header_handler(node, binding);
            }
            cursor = self.dom.parent(node);
        }

        self.trace_state
            .line(format!("[click] {} unhandled", self.node_label(target)));
        Ok(())
    }

    fn run_header_handler(&mut self, header: NodeId, binding: HeaderBinding) -> Result<()> {
        let HeaderBinding { table_slot, column } = binding;
        let sortable = self
            .tables
            .get_mut(table_slot)
            .ok_or_else(|| Error::Dom(format!("no decorated table in slot {table_slot}")))?;
        let label = sortable.label().to_string();
        self.trace_state.line(format!(
            "[click] {label} header={} column={column}",
            header.0
        ));

        match sortable.handle_click(&mut self.dom, column) {
            Ok(Some(direction)) => {
                self.trace_state.line(format!(
                    "[sort] {label} column={column} direction={}",
                    direction.as_str()
                ));
                Ok(())
            }
            Ok(None) => {
                self.trace_state
                    .line(format!("[sort] {label} column={column} skipped"));
                Ok(())
            }
            Err(err) => {
                self.trace_state
                    .line(format!("[sort] {label} column={column} error={err}"));
                Err(err)
            }
        }
    }

    /// Sorts `column` of a decorated table in an explicit direction without
    /// touching the click toggle.
    pub fn sort_table(
        &mut self,
        table: NodeId,
        column: usize,
        direction: SortDirection,
    ) -> Result<()> {
        let sortable = self
            .tables
            .iter()
            .find(|sortable| sortable.table() == table)
            .ok_or_else(|| {
                Error::MissingElement(format!("table node {} is not decorated", table.0))
            })?;
        sortable.sort_column(&mut self.dom, column, direction)
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_log_limit(&mut self, limit: usize) {
        self.trace_state.set_limit(limit);
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.take()
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    /// Text of every body row after the reserved leading rows, cell by cell.
    pub fn row_texts(&self, table_selector: &str) -> Result<Vec<Vec<String>>> {
        let table = self.select_table(table_selector)?;
        Ok(self
            .table_data_rows(table)?
            .into_iter()
            .map(|row| {
                self.dom
                    .elements_by_tag_name(row, "td")
                    .into_iter()
                    .map(|cell| self.dom.text_content(cell))
                    .collect()
            })
            .collect())
    }

    pub fn column_texts(&self, table_selector: &str, column: usize) -> Result<Vec<String>> {
        let table = self.select_table(table_selector)?;
        let label = table_selector.to_string();
        self.table_data_rows(table)?
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                self.dom
                    .elements_by_tag_name(row, "td")
                    .get(column)
                    .map(|cell| self.dom.text_content(*cell))
                    .ok_or_else(|| Error::MalformedRow {
                        table: label.clone(),
                        row: index + self.skip_rows_for(table),
                        column,
                    })
            })
            .collect()
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_column(
        &self,
        table_selector: &str,
        column: usize,
        expected: &[&str],
    ) -> Result<()> {
        let actual = self.column_texts(table_selector, column)?;
        if actual != expected {
            let table = self.select_table(table_selector)?;
            return Err(Error::AssertionFailed {
                selector: format!("{table_selector} column {column}"),
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
                dom_snippet: self.node_snippet(table),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn select_table(&self, selector: &str) -> Result<NodeId> {
        let node = self.select_one(selector)?;
        if !self.dom.has_tag(node, "table") {
            return Err(Error::MissingElement(format!("{selector} is not a <table>")));
        }
        Ok(node)
    }

    fn skip_rows_for(&self, table: NodeId) -> usize {
        self.tables
            .iter()
            .find(|sortable| sortable.table() == table)
            .map(|sortable| sortable.options().skip_leading_rows)
            .unwrap_or(self.config.sort.skip_leading_rows)
    }

    fn table_data_rows(&self, table: NodeId) -> Result<Vec<NodeId>> {
        let body = self
            .dom
            .t_bodies(table)
            .first()
            .copied()
            .ok_or_else(|| Error::MissingElement(format!("tbody of table node {}", table.0)))?;
        Ok(body_rows(&self.dom, body)
            .into_iter()
            .skip(self.skip_rows_for(table))
            .collect())
    }

    fn node_label(&self, node: NodeId) -> String {
        match (self.dom.tag_name(node), self.dom.attr(node, "id")) {
            (Some(tag), Some(id)) if !id.is_empty() => format!("{tag}#{id}"),
            (Some(tag), _) => tag.to_string(),
            (None, _) => format!("node@{}", node.0),
        }
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }
}
