//! Raw HTML table extraction

use scraper::{ElementRef, Html};

/// Identifier of a raw column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnId {
    /// Table had no header row; columns are known only by position
    Index(usize),
    /// Header text of the column
    Named(String),
}

/// A table as published, before any schema is applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// One id per column, in table order
    pub columns: Vec<ColumnId>,
    /// Cell text per row; `None` for missing cells
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Table without headers; width is the widest row
    pub fn positional(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            columns: (0..width).map(ColumnId::Index).collect(),
            rows,
        }
    }

    /// Table with a header row
    pub fn named(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        let mut columns: Vec<ColumnId> = headers.into_iter().map(ColumnId::Named).collect();
        columns.resize(width, ColumnId::Named(String::new()));
        Self { columns, rows }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of data rows
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Cells in the rectangular shape, used to rank candidate tables
    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    /// True when no column carries a header name
    pub fn is_positional(&self) -> bool {
        self.columns.iter().all(|c| matches!(c, ColumnId::Index(_)))
    }
}

struct HtmlRow {
    header: bool,
    cells: Vec<Option<String>>,
}

/// Extract every `<table>` in the document, nested ones included.
///
/// Rows belong to their nearest enclosing table. Leading rows inside `<thead>`
/// or made only of `<th>` cells are headers; the last of them names the
/// columns.
pub fn parse_tables(html: &str) -> Vec<RawTable> {
    let document = Html::parse_document(html);

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "table")
        .map(read_table)
        .collect()
}

/// Pick the disclosure table: widest with at least `min_columns` columns,
/// ties broken by cell count, then by document order.
pub fn select_data_table(tables: Vec<RawTable>, min_columns: usize) -> Option<RawTable> {
    tables
        .into_iter()
        .rev()
        .filter(|t| t.width() >= min_columns)
        .max_by_key(|t| (t.width(), t.cell_count()))
}

fn read_table(table: ElementRef<'_>) -> RawTable {
    let rows: Vec<HtmlRow> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .filter(|tr| owning_table(*tr).map(|t| t.id()) == Some(table.id()))
        .map(read_row)
        .filter(|row| !row.cells.is_empty())
        .collect();

    let header_count = rows.iter().take_while(|r| r.header).count();
    let mut rows = rows.into_iter();
    let headers: Vec<HtmlRow> = rows.by_ref().take(header_count).collect();
    let data: Vec<Vec<Option<String>>> = rows.map(|r| r.cells).collect();

    match headers.into_iter().last() {
        Some(header) => RawTable::named(
            header.cells.into_iter().map(Option::unwrap_or_default).collect(),
            data,
        ),
        None => RawTable::positional(data),
    }
}

fn owning_table(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

fn read_row(tr: ElementRef<'_>) -> HtmlRow {
    let in_thead = tr
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|a| a.value().name() != "table")
        .any(|a| a.value().name() == "thead");

    let mut all_th = true;
    let mut cells = Vec::new();

    for cell in tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
    {
        if cell.value().name() == "td" {
            all_th = false;
        }
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, 64);
        let text = cell_text(cell);
        for _ in 0..span {
            cells.push(text.clone());
        }
    }

    HtmlRow {
        header: in_thead || (all_th && !cells.is_empty()),
        cells,
    }
}

fn cell_text(cell: ElementRef<'_>) -> Option<String> {
    let joined = cell.text().collect::<Vec<_>>().join(" ");
    let text = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn test_positional_table_without_headers() {
        let html = r#"
            <html><body><table>
              <tr><td>500325</td><td>Reliance&nbsp;Industries</td><td> </td></tr>
              <tr><td>532540</td><td>TCS</td><td>1,200</td></tr>
            </table></body></html>"#;

        let tables = parse_tables(html);
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert!(table.is_positional());
        assert_eq!(table.width(), 3);
        assert_eq!(
            table.rows,
            vec![
                vec![s("500325"), s("Reliance Industries"), None],
                vec![s("532540"), s("TCS"), s("1,200")],
            ]
        );
    }

    #[test]
    fn test_header_row_names_columns() {
        let html = r#"
            <table>
              <thead><tr><th>Scrip Code</th><th>Company Name</th></tr></thead>
              <tbody><tr><td>500325</td><td>Reliance</td></tr></tbody>
            </table>"#;

        let table = &parse_tables(html)[0];
        assert_eq!(
            table.columns,
            vec![
                ColumnId::Named("Scrip Code".to_string()),
                ColumnId::Named("Company Name".to_string()),
            ]
        );
        assert_eq!(table.rows, vec![vec![s("500325"), s("Reliance")]]);
    }

    #[test]
    fn test_nested_table_rows_stay_with_inner_table() {
        let html = r#"
            <table id="layout">
              <tr><td>menu</td><td>
                <table id="data">
                  <tr><td>a</td><td>b</td><td>c</td></tr>
                  <tr><td>d</td><td>e</td><td>f</td></tr>
                </table>
              </td></tr>
            </table>"#;

        let tables = parse_tables(html);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].height(), 1);
        assert_eq!(tables[1].height(), 2);
        assert_eq!(tables[1].width(), 3);
    }

    #[test]
    fn test_colspan_repeats_cell() {
        let html = r#"<table><tr><td colspan="2">x</td><td>y</td></tr></table>"#;
        let table = &parse_tables(html)[0];
        assert_eq!(table.rows, vec![vec![s("x"), s("x"), s("y")]]);
    }

    #[test]
    fn test_select_prefers_widest_then_largest() {
        let narrow_big = RawTable::positional(vec![vec![None; 8]; 50]);
        let wide_small = RawTable::positional(vec![vec![None; 16]; 2]);
        let wide_big = RawTable::positional(vec![vec![None; 16]; 10]);
        let too_narrow = RawTable::positional(vec![vec![None; 4]; 500]);

        let picked = select_data_table(
            vec![narrow_big, wide_small, wide_big.clone(), too_narrow],
            8,
        );
        assert_eq!(picked, Some(wide_big));
    }

    #[test]
    fn test_select_none_when_all_too_narrow() {
        let tables = vec![RawTable::positional(vec![vec![None; 3]; 10])];
        assert_eq!(select_data_table(tables, 8), None);
    }
}
