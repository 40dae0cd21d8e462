use super::*;
use crate::config::SortOptions;

/// Order applied by a header click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Sort state attached to one table.
///
/// Every `th` of the table, in document order, controls the column with
/// the same index in each body row's `td` cells. The direction each
/// column will use next is kept per column and flips after every sort of
/// that column.
#[derive(Debug, Clone)]
pub struct SortableTable {
    table: NodeId,
    label: String,
    headers: Vec<NodeId>,
    directions: HashMap<usize, SortDirection>,
    options: SortOptions,
}

impl SortableTable {
    pub(crate) fn attach(dom: &Dom, table: NodeId, options: SortOptions) -> Result<Self> {
        if !dom.has_tag(table, "table") {
            return Err(Error::MissingElement(format!(
                "node {} is not a <table>",
                table.0
            )));
        }
        let label = match dom.attr(table, "id").filter(|id| !id.is_empty()) {
            Some(id) => format!("#{id}"),
            None => format!("table@{}", table.0),
        };
        Ok(Self {
            table,
            label,
            headers: dom.elements_by_tag_name(table, "th"),
            directions: HashMap::new(),
            options,
        })
    }

    pub fn table(&self) -> NodeId {
        self.table
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn headers(&self) -> &[NodeId] {
        &self.headers
    }

    pub fn options(&self) -> SortOptions {
        self.options
    }

    /// Direction the next click on `column` applies.
    pub fn next_direction(&self, column: usize) -> SortDirection {
        self.directions.get(&column).copied().unwrap_or_default()
    }

    pub(crate) fn body(&self, dom: &Dom) -> Result<NodeId> {
        dom.t_bodies(self.table)
            .first()
            .copied()
            .ok_or_else(|| Error::MissingElement(format!("tbody of {}", self.label)))
    }

    /// Body rows that take part in sorting, in current order.
    pub(crate) fn data_rows(&self, dom: &Dom) -> Result<Vec<NodeId>> {
        let body = self.body(dom)?;
        Ok(body_rows(dom, body)
            .into_iter()
            .skip(self.options.skip_leading_rows)
            .collect())
    }

    /// Runs the click behaviour for `column`: sort in the column's pending
    /// direction, then flip it. Returns the direction applied, or `None`
    /// when the body has fewer than two data rows and nothing moved.
    pub(crate) fn handle_click(
        &mut self,
        dom: &mut Dom,
        column: usize,
    ) -> Result<Option<SortDirection>> {
        if self.data_rows(dom)?.len() < 2 {
            log::trace!("{} column {column}: nothing to sort", self.label);
            return Ok(None);
        }
        let direction = self.next_direction(column);
        self.sort_column(dom, column, direction)?;
        self.directions.insert(column, direction.toggled());
        Ok(Some(direction))
    }

    /// Re-orders the data rows by the text of `column`.
    ///
    /// Keys compare by UTF-16 code unit. The ascending order is stable;
    /// descending is the exact reverse of it. Every key is read before any
    /// row moves, so a row without a cell at `column` leaves the table
    /// untouched.
    pub(crate) fn sort_column(
        &self,
        dom: &mut Dom,
        column: usize,
        direction: SortDirection,
    ) -> Result<()> {
        let body = self.body(dom)?;
        let rows = self.data_rows(dom)?;

        let mut keyed = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let cell = dom
                .elements_by_tag_name(*row, "td")
                .get(column)
                .copied()
                .ok_or_else(|| Error::MalformedRow {
                    table: self.label.clone(),
                    row: index + self.options.skip_leading_rows,
                    column,
                })?;
            let key = dom.text_content(cell).encode_utf16().collect::<Vec<u16>>();
            keyed.push((key, *row));
        }

        keyed.sort_by(|(left, _), (right, _)| left.cmp(right));
        if direction == SortDirection::Descending {
            keyed.reverse();
        }

        for (_, row) in keyed {
            dom.append_child(body, row)?;
        }
        log::debug!(
            "sorted {} rows of {} by column {column} ({})",
            rows.len(),
            self.label,
            direction.as_str()
        );
        Ok(())
    }
}

pub(crate) fn body_rows(dom: &Dom, body: NodeId) -> Vec<NodeId> {
    dom.child_elements(body)
        .into_iter()
        .filter(|child| dom.has_tag(*child, "tr"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    fn fixture(rows: &[&str]) -> Result<(Dom, SortableTable)> {
        let mut html = String::from("<table id='t'><tr><th>id</th><th>name</th></tr>");
        for (index, name) in rows.iter().enumerate() {
            html.push_str(&format!("<tr><td>{index}</td><td>{name}</td></tr>"));
        }
        html.push_str("</table>");
        let dom = parse_html(&html)?;
        let table = dom.by_id("t").ok_or_else(|| Error::MissingElement("t".into()))?;
        let sortable = SortableTable::attach(&dom, table, SortOptions::default())?;
        Ok((dom, sortable))
    }

    fn names(dom: &Dom, sortable: &SortableTable) -> Result<Vec<String>> {
        sortable
            .data_rows(dom)?
            .into_iter()
            .map(|row| {
                let cells = dom.elements_by_tag_name(row, "td");
                Ok(dom.text_content(cells[1]))
            })
            .collect()
    }

    #[test]
    fn direction_toggles_per_column() -> Result<()> {
        let (mut dom, mut sortable) = fixture(&["b", "a", "c"])?;
        assert_eq!(sortable.headers().len(), 2);
        assert_eq!(sortable.handle_click(&mut dom, 1)?, Some(SortDirection::Ascending));
        assert_eq!(sortable.next_direction(1), SortDirection::Descending);
        assert_eq!(sortable.next_direction(0), SortDirection::Ascending);
        assert_eq!(sortable.handle_click(&mut dom, 1)?, Some(SortDirection::Descending));
        assert_eq!(names(&dom, &sortable)?, vec!["c", "b", "a"]);
        assert_eq!(sortable.next_direction(1), SortDirection::Ascending);
        Ok(())
    }

    #[test]
    fn header_row_stays_first() -> Result<()> {
        let (mut dom, mut sortable) = fixture(&["b", "a"])?;
        sortable.handle_click(&mut dom, 1)?;
        let body = sortable.body(&dom)?;
        let rows = body_rows(&dom, body);
        assert_eq!(dom.elements_by_tag_name(rows[0], "th").len(), 2);
        assert_eq!(rows.len(), 3);
        Ok(())
    }

    #[test]
    fn single_data_row_is_a_no_op() -> Result<()> {
        let (mut dom, mut sortable) = fixture(&["only"])?;
        assert_eq!(sortable.handle_click(&mut dom, 1)?, None);
        assert_eq!(sortable.next_direction(1), SortDirection::Ascending);
        Ok(())
    }

    #[test]
    fn string_comparison_is_not_numeric() -> Result<()> {
        let (mut dom, mut sortable) = fixture(&["2", "10", "1"])?;
        sortable.handle_click(&mut dom, 1)?;
        assert_eq!(names(&dom, &sortable)?, vec!["1", "10", "2"]);
        Ok(())
    }

    #[test]
    fn keys_compare_by_utf16_code_units() -> Result<()> {
        // U+1F600 is above U+FF21 as a code point but its leading surrogate is below it
        let (mut dom, mut sortable) = fixture(&["\u{1F600}", "\u{FF21}"])?;
        sortable.handle_click(&mut dom, 1)?;
        assert_eq!(names(&dom, &sortable)?, vec!["\u{1F600}", "\u{FF21}"]);
        Ok(())
    }

    #[test]
    fn missing_cell_fails_before_moving_rows() -> Result<()> {
        let html = "<table id='t'><tr><th>a</th><th>b</th></tr>\
                    <tr><td>z</td><td>1</td></tr><tr><td>y</td></tr><tr><td>x</td><td>3</td></tr></table>";
        let mut dom = parse_html(html)?;
        let table = dom.by_id("t").ok_or_else(|| Error::MissingElement("t".into()))?;
        let mut sortable = SortableTable::attach(&dom, table, SortOptions::default())?;
        let before = sortable.data_rows(&dom)?;

        let err = sortable.handle_click(&mut dom, 1).unwrap_err();
        assert_eq!(
            err,
            Error::MalformedRow {
                table: "#t".into(),
                row: 2,
                column: 1,
            }
        );
        assert_eq!(sortable.data_rows(&dom)?, before);
        assert_eq!(sortable.next_direction(1), SortDirection::Ascending);

        sortable.handle_click(&mut dom, 0)?;
        let firsts = sortable
            .data_rows(&dom)?
            .into_iter()
            .map(|row| dom.text_content(dom.elements_by_tag_name(row, "td")[0]))
            .collect::<Vec<_>>();
        assert_eq!(firsts, vec!["x", "y", "z"]);
        Ok(())
    }

    #[test]
    fn attach_rejects_non_table() -> Result<()> {
        let dom = parse_html("<div id='d'></div>")?;
        let div = dom.by_id("d").ok_or_else(|| Error::MissingElement("d".into()))?;
        assert!(matches!(
            SortableTable::attach(&dom, div, SortOptions::default()),
            Err(Error::MissingElement(_))
        ));
        Ok(())
    }

    #[test]
    fn table_without_body_reports_missing_body() -> Result<()> {
        let mut dom = parse_html("<table id='t'><thead><tr><th>a</th></tr></thead></table>")?;
        let table = dom.by_id("t").ok_or_else(|| Error::MissingElement("t".into()))?;
        let mut sortable = SortableTable::attach(&dom, table, SortOptions::default())?;
        assert_eq!(
            sortable.handle_click(&mut dom, 0).unwrap_err(),
            Error::MissingElement("tbody of #t".into())
        );
        Ok(())
    }
}
