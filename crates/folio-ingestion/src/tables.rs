//! Tabular grid detection on page text.
//!
//! Works on the text lines of a page, not on drawn rules: a line is a row
//! candidate when it splits into two or more cells on `|`, a tab, or a gap of
//! two or more spaces. Consecutive candidates with the same cell count form a
//! grid.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::TableRecord;

lazy_static! {
    static ref COLUMN_GAP: Regex = Regex::new(r"\t+|\s{2,}").unwrap();
}

/// Fewest consecutive rows that count as a table.
pub const MIN_TABLE_ROWS: usize = 2;

fn split_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cells: Vec<String> = if trimmed.contains('|') {
        let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        inner.split('|').map(|c| c.trim().to_string()).collect()
    } else {
        COLUMN_GAP.split(trimmed).map(|c| c.trim().to_string()).collect()
    };

    (cells.len() >= 2).then_some(cells)
}

/// Every grid found in one page's text, top to bottom.
pub fn detect_grids(page_text: &str) -> Vec<Vec<Vec<String>>> {
    let mut grids = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    let mut close_run = |run: &mut Vec<Vec<String>>| {
        if run.len() >= MIN_TABLE_ROWS {
            grids.push(std::mem::take(run));
        } else {
            run.clear();
        }
    };

    for line in page_text.lines() {
        match split_cells(line) {
            Some(cells) => {
                if run.last().is_some_and(|prev| prev.len() != cells.len()) {
                    close_run(&mut run);
                }
                run.push(cells);
            }
            None => close_run(&mut run),
        }
    }
    close_run(&mut run);

    grids
        .into_iter()
        .filter(|grid| grid.iter().flatten().any(|cell| !cell.trim().is_empty()))
        .collect()
}

/// Table records for one page, numbered from 1 within the page.
pub fn tables_for_page(page_number: u32, page_text: &str) -> Vec<TableRecord> {
    detect_grids(page_text)
        .into_iter()
        .enumerate()
        .map(|(i, data)| {
            let table_index = i + 1;
            TableRecord {
                table_id: format!("table_{page_number}_{table_index}"),
                page_number,
                table_index,
                rows: data.len(),
                columns: data.first().map_or(0, Vec::len),
                data,
            }
        })
        .collect()
}
