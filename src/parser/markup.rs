use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, SalesError};

/// Rows x columns of trimmed cell text. Rows may differ in length.
pub type Grid = Vec<Vec<String>>;

/// The only capabilities the pipeline needs from a markup tree.
pub trait TableMarkup {
    type Node<'a>: Copy
    where
        Self: 'a;

    /// Every table-like node, in document order.
    fn tables(&self) -> Vec<Self::Node<'_>>;

    /// Row-like descendants of a table, in document order.
    fn rows<'a>(&'a self, table: Self::Node<'a>) -> Vec<Self::Node<'a>>;

    /// Cell-like descendants of a row, in document order.
    fn cells<'a>(&'a self, row: Self::Node<'a>) -> Vec<Self::Node<'a>>;

    /// Concatenated text of a cell, trimmed.
    fn text(&self, cell: Self::Node<'_>) -> String;
}

/// `TableMarkup` over an html5ever tree.
pub struct HtmlMarkup {
    doc: Html,
}

impl HtmlMarkup {
    pub fn parse(markup: &str) -> Self {
        Self {
            doc: Html::parse_document(markup),
        }
    }
}

fn table_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("table").expect("invalid table selector"))
}

fn row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("tr").expect("invalid tr selector"))
}

fn cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("td, th").expect("invalid cell selector"))
}

impl TableMarkup for HtmlMarkup {
    type Node<'a> = ElementRef<'a> where Self: 'a;

    fn tables(&self) -> Vec<ElementRef<'_>> {
        self.doc.select(table_selector()).collect()
    }

    fn rows<'a>(&'a self, table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        table.select(row_selector()).collect()
    }

    fn cells<'a>(&'a self, row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        row.select(cell_selector()).collect()
    }

    fn text(&self, cell: ElementRef<'_>) -> String {
        cell.text().collect::<String>().trim().to_string()
    }
}

/// Pick the table with the most rows; the first one wins a tie.
/// Returns the chosen table and how many tables were seen.
pub fn locate_table<M: TableMarkup>(markup: &M) -> Result<(M::Node<'_>, usize)> {
    let tables = markup.tables();
    let found = tables.len();
    let mut best: Option<(M::Node<'_>, usize)> = None;
    for table in tables {
        let rows = markup.rows(table).len();
        match best {
            Some((_, most)) if rows <= most => {}
            _ => best = Some((table, rows)),
        }
    }
    best.map(|(table, _)| (table, found)).ok_or(SalesError::NoTables)
}

/// Walk a table into a grid, dropping rows that carry no cells.
pub fn extract_grid<'a, M: TableMarkup>(markup: &'a M, table: M::Node<'a>) -> Grid {
    markup
        .rows(table)
        .into_iter()
        .map(|row| {
            markup
                .cells(row)
                .into_iter()
                .map(|cell| markup.text(cell))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Parse normalized markup and return the grid of its best table plus the
/// number of tables found.
pub fn read_grid(markup: &str) -> Result<(Grid, usize)> {
    let doc = HtmlMarkup::parse(markup);
    let (table, found) = locate_table(&doc)?;
    Ok((extract_grid(&doc, table), found))
}
