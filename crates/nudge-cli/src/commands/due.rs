use nudge_core::due::{display_clock, normalize_due_date, DueDateFields};
use nudge_core::util::format_timestamp;

use crate::commands::common::parse_viewer_zone;
use crate::error::CliError;

pub fn run_due(
    input: &str,
    timezone: &str,
    is_floating: bool,
    is_date_only: bool,
) -> Result<(), CliError> {
    for line in describe_due(input, timezone, is_floating, is_date_only)? {
        println!("{line}");
    }
    Ok(())
}

pub fn describe_due(
    input: &str,
    timezone: &str,
    is_floating: bool,
    is_date_only: bool,
) -> Result<Vec<String>, CliError> {
    let zone = parse_viewer_zone(timezone)?;
    let stored = normalize_due_date(input, timezone, is_floating, is_date_only)?;
    let fields = DueDateFields::resolve(Some(timezone), Some(is_floating), Some(is_date_only), None);

    let mut lines = vec![format!("Stored as: {}", format_timestamp(&stored))];
    if fields.keeps_clock_reading() {
        lines.push("Shown as the same clock reading in every timezone".to_string());
    } else {
        lines.push(format!(
            "Shown in {}: {}",
            zone.name(),
            display_clock(stored, &fields, zone).format("%Y-%m-%d %H:%M")
        ));
    }
    Ok(lines)
}
