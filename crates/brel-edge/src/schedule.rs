//! Reader for the Edge release schedule published as a markdown table.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Stable release date announced for one Edge version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub stable: NaiveDate,
    /// `true` when the table only names the week ("Week of ...").
    pub projected: bool,
}

/// Collect the stable release date of every version row in the schedule.
///
/// Rows look like `| 121 | Released | Week of 08-Jan-2024 | 11-Jan-2024 | Week of 22-Jan-2024 |`:
/// the first cell is the version and the last one the stable release.
/// Struck-through cells (`~~...~~`) and cells without a date are ignored.
#[must_use]
pub fn parse_schedule(markdown: &str) -> BTreeMap<u32, ScheduleEntry> {
    markdown
        .lines()
        .filter_map(|line| {
            let cells = table_cells(line)?;
            let version = cells.first()?.trim_matches('*').parse::<u32>().ok()?;
            let entry = parse_stable_cell(cells.last()?)?;
            Some((version, entry))
        })
        .collect()
}

fn table_cells(line: &str) -> Option<Vec<&str>> {
    let inner = line.trim().strip_prefix('|')?;
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<&str> = inner.split('|').map(str::trim).collect();
    (cells.len() >= 2).then_some(cells)
}

fn parse_stable_cell(cell: &str) -> Option<ScheduleEntry> {
    if cell.starts_with("~~") {
        return None;
    }
    let projected = cell.to_ascii_lowercase().contains("week of");
    let stable = cell
        .split(|c: char| c.is_whitespace() || c == '<' || c == '>' || c == '*')
        .find_map(|token| NaiveDate::parse_from_str(token, "%d-%b-%Y").ok())?;
    Some(ScheduleEntry { stable, projected })
}
