use std::collections::BTreeMap;

use nudge_core::config::ClientConfig;
use nudge_core::models::EntityType;
use nudge_core::services::LocalStore;
use serde::Serialize;

use crate::commands::common::{format_optional_timestamp, open_store, resolve_db_path};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub api_base_url: String,
    pub db_path: String,
    pub sync_enabled: bool,
    pub lists: usize,
    pub reminders: usize,
    pub open_reminders: usize,
    pub checkpoints: BTreeMap<String, String>,
}

pub async fn run_status(config: &ClientConfig, as_json: bool) -> Result<(), CliError> {
    let store = open_store(config)?;
    let mut report = collect_status(&store).await?;
    report.api_base_url.clone_from(&config.api_base_url);
    report.db_path = resolve_db_path(config)?.display().to_string();
    report.sync_enabled = config.sync_enabled;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Server:     {}", report.api_base_url);
    println!("Cache:      {}", report.db_path);
    println!(
        "Sync:       {}",
        if report.sync_enabled { "enabled" } else { "disabled" }
    );
    println!("Lists:      {}", report.lists);
    println!(
        "Reminders:  {} ({} open)",
        report.reminders, report.open_reminders
    );
    for (entity, last) in &report.checkpoints {
        println!("Last sync:  {entity} {last}");
    }
    Ok(())
}

pub async fn collect_status(store: &LocalStore) -> Result<StatusReport, CliError> {
    let lists = store.list_lists().await?;
    let reminders = store.list_reminders(None).await?;

    let mut checkpoints = BTreeMap::new();
    for entity in EntityType::ALL {
        let last = store.checkpoint(entity).await?;
        checkpoints.insert(
            entity.to_string(),
            format_optional_timestamp(last.as_ref()),
        );
    }

    Ok(StatusReport {
        api_base_url: String::new(),
        db_path: store
            .path()
            .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string()),
        sync_enabled: true,
        lists: lists.len(),
        reminders: reminders.len(),
        open_reminders: reminders.iter().filter(|reminder| !reminder.completed).count(),
        checkpoints,
    })
}
