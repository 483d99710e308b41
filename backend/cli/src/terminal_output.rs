//! Terminal output utilities: notes, risk colouring and table rendering.

use dprscope_core::{DprRecord, RiskLevel};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// Risk level coloured the way the dashboard badges are: green, amber, red.
pub fn risk_badge(level: Option<RiskLevel>, color: bool) -> String {
    let Some(level) = level else {
        return "-".to_string();
    };
    if !color {
        return level.to_string();
    }
    let tint = match level {
        RiskLevel::Low => GREEN,
        RiskLevel::Medium => YELLOW,
        RiskLevel::High => RED,
    };
    format!("{tint}{level}{RESET}")
}

pub enum Align {
    Left,
    Right,
}

pub struct Column {
    pub header: String,
    pub align: Align,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Left,
        }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            align: Align::Right,
        }
    }
}

/// Render a table; widths ignore ANSI escapes.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns
        .iter()
        .map(|c| strip_ansi(&c.header).chars().count())
        .collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            widths[i] = widths[i].max(strip_ansi(cell).chars().count());
        }
    }

    let line = |cells: Vec<String>| format!("  {}\n", cells.join("  ").trim_end());

    let mut out = String::new();
    out.push_str(&line(
        columns
            .iter()
            .enumerate()
            .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
            .collect(),
    ));
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        out.push_str(&line(
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    pad_cell(cell, widths[i], &col.align)
                })
                .collect(),
        ));
    }
    out
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = " ".repeat(width.saturating_sub(strip_ansi(s).chars().count()));
    match align {
        Align::Left => format!("{s}{pad}"),
        Align::Right => format!("{pad}{s}"),
    }
}

/// Dashboard-style table of records.
pub fn records_table(records: &[DprRecord], color: bool) -> String {
    let columns = [
        Column::left("ID"),
        Column::left("File"),
        Column::left("Status"),
        Column::left("Risk"),
        Column::right("Score"),
        Column::left("Decision"),
        Column::left("Uploaded"),
    ];
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.filename.clone(),
                r.status.to_string(),
                risk_badge(r.risk_level, color),
                r.overall_score.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                r.decision.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn colored_cells_align() {
        let cols = vec![Column::left("Risk"), Column::right("Score")];
        let rows = vec![
            vec![risk_badge(Some(RiskLevel::High), true), "70".to_string()],
            vec![risk_badge(Some(RiskLevel::Medium), false), "5".to_string()],
        ];
        let table = strip_ansi(&render_table(&cols, &rows));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2], "  High       70");
        assert_eq!(lines[3], "  Medium      5");
    }

    #[test]
    fn records_table_shows_placeholders() {
        let record = DprRecord::new("pending.pdf");
        let table = records_table(&[record], false);
        assert!(table.contains("pending.pdf"));
        assert!(table.contains("processing"));
    }
}
