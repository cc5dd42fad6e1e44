//! Table detection in extracted PDF page text.
//!
//! Text extraction flattens a page into lines, with table columns separated
//! by runs of whitespace. A *table region* opens at a line that splits into
//! at least [`TableLayout::min_cells`] cells; that line is the header and
//! its cell offsets are the column starts. The region continues through
//! lines that are wide enough to be rows or that begin with a row key (a
//! `Mon-YY` month by default), and closes at a blank or prose line.
//!
//! Rows with fewer cells than the header are placed by column position, so
//! a blank value stays an empty cell instead of shifting its neighbours.

use regex::Regex;

/// Default cell separator: a tab, or two or more spaces.
pub const DEFAULT_CELL_SEPARATOR: &str = r"\t|[ ]{2,}";

/// Default row key: a `Mon-YY` month token at the start of the line.
pub const DEFAULT_ROW_KEY: &str = r"^\s*[A-Za-z]{3}-\d{2}\b";

/// A table found on a page: rows of trimmed cell text, header included.
///
/// Body rows are aligned to the header's columns where they have fewer
/// cells; rows with as many or more cells than the header are kept as
/// split.
pub type TextTable = Vec<Vec<String>>;

/// A cell: its starting column (in characters) and trimmed text.
type Cell<'a> = (usize, &'a str);

/// How to split lines into cells and recognise table regions.
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Pattern separating adjacent cells on a line.
    pub cell_separator: Regex,
    /// Minimum number of cells for a line to open a table or count as a
    /// full row.
    pub min_cells: usize,
    /// Lines matching this pattern stay in the current table however many
    /// cells they have. `None` disables the rule.
    pub row_key: Option<Regex>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            cell_separator: Regex::new(DEFAULT_CELL_SEPARATOR)
                .unwrap_or_else(|_| unreachable!("default separator is a valid pattern")),
            min_cells: 3,
            row_key: Regex::new(DEFAULT_ROW_KEY).ok(),
        }
    }
}

impl TableLayout {
    /// Creates a layout with a custom separator pattern.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if `pattern` fails to compile.
    pub fn with_separator(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            cell_separator: Regex::new(pattern)?,
            ..Self::default()
        })
    }

    /// Sets the minimum cell count for a table row.
    #[must_use]
    pub const fn with_min_cells(mut self, min_cells: usize) -> Self {
        self.min_cells = min_cells;
        self
    }

    /// Sets the row-key pattern, or disables it with `None`.
    #[must_use]
    pub fn with_row_key(mut self, row_key: Option<Regex>) -> Self {
        self.row_key = row_key;
        self
    }

    /// Splits a line into trimmed, non-empty cells.
    #[must_use]
    pub fn split_cells<'a>(&self, line: &'a str) -> Vec<&'a str> {
        self.cells(line).into_iter().map(|(_, text)| text).collect()
    }

    /// Finds every table region on a page, in top-to-bottom order.
    #[must_use]
    pub fn find_tables(&self, page_text: &str) -> Vec<TextTable> {
        let mut tables = Vec::new();
        let mut current: TextTable = Vec::new();
        let mut columns: Vec<usize> = Vec::new();

        for line in page_text.lines() {
            let cells = self.cells(line);

            if current.is_empty() {
                if cells.len() >= self.min_cells {
                    columns = cells.iter().map(|(start, _)| *start).collect();
                    current.push(owned(&cells));
                }
                continue;
            }

            if cells.len() >= self.min_cells || (!cells.is_empty() && self.is_row_key(line)) {
                current.push(align(&columns, &cells));
            } else {
                tables.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            tables.push(current);
        }

        tables
    }

    fn is_row_key(&self, line: &str) -> bool {
        self.row_key.as_ref().is_some_and(|key| key.is_match(line))
    }

    /// Splits `line` into non-empty cells with their character offsets.
    fn cells<'a>(&self, line: &'a str) -> Vec<Cell<'a>> {
        let mut cells = Vec::new();
        let mut from = 0;
        for separator in self.cell_separator.find_iter(line) {
            push_cell(&mut cells, line, from, separator.start());
            from = separator.end();
        }
        push_cell(&mut cells, line, from, line.len());
        cells
    }
}

fn push_cell<'a>(cells: &mut Vec<Cell<'a>>, line: &'a str, from: usize, to: usize) {
    let raw = &line[from..to];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let byte_start = from + (raw.len() - raw.trim_start().len());
    cells.push((line[..byte_start].chars().count(), text));
}

fn owned(cells: &[Cell<'_>]) -> Vec<String> {
    cells.iter().map(|(_, text)| (*text).to_owned()).collect()
}

/// Places a short row's cells under the nearest header column, leaving
/// gaps empty. Rows that are not short, or where two cells claim the same
/// column, are returned as split.
fn align(columns: &[usize], cells: &[Cell<'_>]) -> Vec<String> {
    if cells.len() >= columns.len() {
        return owned(cells);
    }

    let mut row = vec![String::new(); columns.len()];
    for (start, text) in cells {
        let Some(index) = columns
            .iter()
            .enumerate()
            .min_by_key(|(_, column)| column.abs_diff(*start))
            .map(|(index, _)| index)
        else {
            return owned(cells);
        };
        if !row[index].is_empty() {
            log::debug!("Ambiguous column placement for row {:?}", owned(cells));
            return owned(cells);
        }
        row[index] = (*text).to_owned();
    }
    row
}
