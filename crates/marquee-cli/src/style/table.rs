//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use marquee_delegation::GrantStatus;

use super::colors::SemanticStyle;

/// Creates a table with the standard look and a bold header row.
pub fn styled_table(columns: &[&str]) -> Table {
    let mut table = Table::new();

    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = columns
        .iter()
        .map(|col| {
            if super::no_color() {
                Cell::new(col)
            } else {
                Cell::new(col)
                    .add_attribute(Attribute::Bold)
                    .fg(Color::Cyan)
            }
        })
        .collect();
    table.set_header(header_cells);

    table
}

/// Prints a table followed by a muted row-count footer.
pub fn print_table(table: &Table, count: usize, noun: &str) {
    println!("{table}");
    let word = if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    };
    println!("{}", format!("({count} {word})").muted());
}

/// Renders a grant status as a checkbox-like cell.
pub fn status_cell(status: GrantStatus) -> Cell {
    let (text, color) = match status {
        GrantStatus::Full => ("[x] full", Color::Green),
        GrantStatus::Partial => ("[-] partial", Color::Yellow),
        GrantStatus::None => ("[ ] none", Color::DarkGrey),
    };
    if super::no_color() {
        Cell::new(text)
    } else {
        Cell::new(text).fg(color)
    }
}
