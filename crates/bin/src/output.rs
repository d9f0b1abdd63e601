//! Output formatting helpers for human-readable and JSON output.

use clap::ValueEnum;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print `title` followed by an aligned table, or `empty` when there are no
/// rows.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_section(title: &str, empty: &str, headers: &[&str], rows: &[Vec<String>]) {
    println!("{title} ({}):", rows.len());
    if rows.is_empty() {
        println!("  {empty}");
    } else {
        for line in table_lines(headers, rows) {
            println!("  {line}");
        }
    }
    println!();
}

/// Render a table with columns padded to their widest cell.
pub fn table_lines(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let pad = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(pad(headers.to_vec()));
    for row in rows {
        lines.push(pad(row.iter().take(col_count).map(String::as_str).collect()));
    }
    lines
}
