use chrono::Utc;
use nudge_core::config::ClientConfig;
use nudge_core::models::{CachedReminder, CompletedVisibility, ListId, UserPreferences};
use nudge_core::views::{arrange_for_display, SmartList};

use crate::commands::common::{format_reminder_lines, open_store, parse_viewer_zone};
use crate::error::CliError;

pub struct ReminderQuery<'a> {
    pub list: Option<&'a str>,
    pub smart: Option<&'a str>,
    pub timezone: &'a str,
    pub show_all_completed: bool,
    pub as_json: bool,
}

pub async fn run_reminders(config: &ClientConfig, query: &ReminderQuery<'_>) -> Result<(), CliError> {
    let viewer = parse_viewer_zone(query.timezone)?;
    let smart = query.smart.map(str::parse::<SmartList>).transpose()?;
    let store = open_store(config)?;
    let list_id = query.list.map(ListId::from);
    let cached = store.list_reminders(list_id.as_ref()).await?;
    let now = Utc::now();

    let reminders: Vec<CachedReminder> = match smart {
        Some(smart) => smart.filter(&cached, viewer, now),
        None => {
            let prefs = UserPreferences {
                completed_visibility: if query.show_all_completed {
                    CompletedVisibility::ShowAll
                } else {
                    UserPreferences::default().completed_visibility
                },
                ..UserPreferences::default()
            };
            arrange_for_display(&cached, &prefs, viewer, now)
        }
    };

    if query.as_json {
        println!("{}", serde_json::to_string_pretty(&reminders)?);
    } else if reminders.is_empty() {
        println!("No reminders.");
    } else {
        for line in format_reminder_lines(&reminders, viewer) {
            println!("{line}");
        }
    }
    Ok(())
}
