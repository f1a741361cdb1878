//! Terminal UI utilities.
//!
//! `Table` renders an auto-sizing table with Unicode box-drawing
//! characters; columns shrink (down to 8 characters) until the table fits
//! the terminal.
//!
//! ```
//! use cbake::ui::Table;
//!
//! let mut table = Table::new(&["Key", "Value"]);
//! table.add_row(vec!["binary_type".to_string(), "exe".to_string()]);
//! assert!(table.render(80).contains("binary_type"));
//! ```

use colored::*;
use console::{measure_text_width, truncate_str};

/// Narrowest a column gets when shrinking to fit.
const MIN_COLUMN_WIDTH: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are ignored.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(measure_text_width(&sanitize_content(cell)));
            }
        }

        let overhead = 3 + 3 * self.headers.len();
        let available = max_width.saturating_sub(overhead);
        let mut total: usize = widths.iter().sum();

        while total > available {
            // Shrink the widest column one step at a time.
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|&(_, w)| *w) else {
                break;
            };
            if widest <= MIN_COLUMN_WIDTH {
                break;
            }
            widths[idx] -= 1;
            total -= 1;
        }
        widths
    }

    /// The table as text, fitted to `max_width` columns.
    pub fn render(&self, max_width: usize) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let widths = self.column_widths(max_width);

        let separator = |left: &str, mid: &str, right: &str| -> String {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {left}{}{right}\n", cells.join(mid))
        };

        let mut out = String::new();
        out.push_str(&separator("┌", "┬", "┐"));

        out.push_str("  │");
        for (header, &width) in self.headers.iter().zip(&widths) {
            let cell = truncate_str(header, width, "...");
            let padding = width.saturating_sub(measure_text_width(&cell));
            out.push_str(&format!(" {} {}│", cell.bold(), " ".repeat(padding)));
        }
        out.push('\n');
        out.push_str(&separator("├", "┼", "┤"));

        for row in &self.rows {
            out.push_str("  │");
            for (cell, &width) in row.iter().zip(&widths) {
                let clean = sanitize_content(cell);
                let cell = truncate_str(&clean, width, "...");
                let padding = width.saturating_sub(measure_text_width(&cell));
                out.push_str(&format!(" {} {}│", cell, " ".repeat(padding)));
            }
            out.push('\n');
        }

        out.push_str(&separator("└", "┴", "┘"));
        out
    }

    /// Prints the table sized to the terminal.
    pub fn print(&self) {
        let (_rows, cols) = console::Term::stdout().size();
        print!("{}", self.render(cols as usize));
    }
}

fn sanitize_content(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}
