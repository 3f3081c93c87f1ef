use nudge_core::config::ClientConfig;
use nudge_core::models::CachedList;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_lists(config: &ClientConfig, as_json: bool) -> Result<(), CliError> {
    let store = open_store(config)?;
    let lists = store.list_lists().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
    } else if lists.is_empty() {
        println!("No cached lists. Run `nudge sync` first.");
    } else {
        for line in format_list_lines(&lists) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_list_lines(lists: &[CachedList]) -> Vec<String> {
    lists
        .iter()
        .map(|list| format!("{} ({} open)  [{}]", list.name, list.incomplete_count, list.id))
        .collect()
}
