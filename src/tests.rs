use super::*;

const RESULT_PAGE: &str = r#"
    <table id="tstTable">
      <tr><th>time</th><th>sn</th><th>res</th></tr>
      <tr><td>2024-03-02 08:00</td><td>SN0003</td><td class="tst_res">P</td></tr>
      <tr><td>2024-03-01 21:15</td><td>SN0001</td><td class="tst_res">F</td></tr>
      <tr><td>2024-03-02 07:30</td><td>SN0002</td><td class="tst_res">S</td></tr>
    </table>
"#;

#[test]
fn click_sorts_then_reverses() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    page.on_load()?;

    page.click("#tstTable th:nth-child(2)")?;
    page.assert_column("#tstTable", 1, &["SN0001", "SN0002", "SN0003"])?;

    page.click("#tstTable th:nth-child(2)")?;
    page.assert_column("#tstTable", 1, &["SN0003", "SN0002", "SN0001"])?;

    page.click("#tstTable th:nth-child(2)")?;
    page.assert_column("#tstTable", 1, &["SN0001", "SN0002", "SN0003"])?;
    Ok(())
}

#[test]
fn columns_keep_independent_directions() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    page.on_load()?;
    let table = page.table_by_id("tstTable")?;

    page.click("#tstTable th:nth-child(1)")?;
    assert_eq!(page.sort_direction(table, 0), Some(SortDirection::Descending));
    assert_eq!(page.sort_direction(table, 2), Some(SortDirection::Ascending));

    page.click("#tstTable th:nth-child(3)")?;
    page.assert_column("#tstTable", 2, &["F", "P", "S"])?;
    assert_eq!(page.sort_direction(table, 0), Some(SortDirection::Descending));
    Ok(())
}

#[test]
fn on_load_decorates_each_table_once() -> Result<()> {
    let config = PageConfig::default().with_required("tstTable");
    let mut page = Page::from_html_with_config(RESULT_PAGE, config)?;
    page.on_load()?;
    page.on_load()?;
    assert_eq!(page.decorated_tables().len(), 1);
    assert_eq!(page.handlers.len(), 3);

    // a doubled binding would sort and then immediately reverse
    page.click("#tstTable th:nth-child(2)")?;
    page.assert_column("#tstTable", 1, &["SN0001", "SN0002", "SN0003"])?;
    Ok(())
}

#[test]
fn on_load_requires_the_main_table() -> Result<()> {
    let mut page = Page::from_html("<table id='other'><tr><th>a</th></tr></table>")?;
    assert_eq!(
        page.on_load().unwrap_err(),
        Error::MissingElement("#tstTable".into())
    );
    Ok(())
}

#[test]
fn table_by_id_rejects_non_table() -> Result<()> {
    let page = Page::from_html("<div id='tstTable'></div>")?;
    assert!(matches!(
        page.table_by_id("tstTable"),
        Err(Error::MissingElement(_))
    ));
    Ok(())
}

#[test]
fn click_outside_headers_is_ignored() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    page.on_load()?;
    page.enable_trace(true);
    page.click("#tstTable td")?;
    page.assert_column("#tstTable", 1, &["SN0003", "SN0001", "SN0002"])?;
    assert_eq!(page.take_trace_logs(), vec!["[click] td unhandled"]);
    Ok(())
}

#[test]
fn trace_records_decorate_click_and_sort() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    page.enable_trace(true);
    page.on_load()?;
    let header = page.select_one("#tstTable th:nth-child(3)")?;
    page.click_node(header)?;

    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0], "[decorate] #tstTable headers=3");
    assert_eq!(
        logs[1],
        format!("[click] #tstTable header={} column=2", header.0)
    );
    assert_eq!(logs[2], "[sort] #tstTable column=2 direction=asc");
    Ok(())
}

#[test]
fn assert_column_reports_mismatch() -> Result<()> {
    let page = Page::from_html(RESULT_PAGE)?;
    match page.assert_column("#tstTable", 2, &["P"]) {
        Err(Error::AssertionFailed {
            selector, actual, ..
        }) => {
            assert_eq!(selector, "#tstTable column 2");
            assert_eq!(actual, r#"["P", "F", "S"]"#);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn row_texts_skip_reserved_row() -> Result<()> {
    let page = Page::from_html(RESULT_PAGE)?;
    let rows = page.row_texts("#tstTable")?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], vec!["2024-03-01 21:15", "SN0001", "F"]);
    Ok(())
}

#[test]
fn custom_skip_count_sorts_every_row() -> Result<()> {
    let html = r#"
        <table id="plain">
          <thead><tr><th>name</th></tr></thead>
          <tbody><tr><td>b</td></tr><tr><td>a</td></tr></tbody>
        </table>
    "#;
    let mut page = Page::from_html(html)?;
    let table = page.table_by_id("plain")?;
    page.decorate_table_with(table, SortOptions::default().with_skip_leading_rows(0))?;
    page.click("#plain th")?;
    page.assert_column("#plain", 0, &["a", "b"])?;
    Ok(())
}

#[test]
fn sort_table_leaves_toggle_alone() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    page.on_load()?;
    let table = page.table_by_id("tstTable")?;
    page.sort_table(table, 1, SortDirection::Descending)?;
    page.assert_column("#tstTable", 1, &["SN0003", "SN0002", "SN0001"])?;
    assert_eq!(page.sort_direction(table, 1), Some(SortDirection::Ascending));
    Ok(())
}

#[test]
fn sort_table_requires_decoration() -> Result<()> {
    let mut page = Page::from_html(RESULT_PAGE)?;
    let table = page.table_by_id("tstTable")?;
    assert!(matches!(
        page.sort_table(table, 0, SortDirection::Ascending),
        Err(Error::MissingElement(_))
    ));
    assert_eq!(page.sort_direction(table, 0), None);
    Ok(())
}
