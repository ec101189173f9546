//! Sync, unsync and status handlers

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::logger;
use crate::model::Config;
use crate::report::{Outcome, Report};
use crate::sync::{self, EntryState, EntryStatus, ForceMode};
use crate::trash::{DirectoryTrash, SystemTrash, Trash};

const RELOGIN_NOTICE: &str = "Log-out and log-in to see the changes completely";

/// Handle `sync`: reconcile every sync entry into the sync directory
pub fn handle_sync(config: &Config, force: ForceMode, trash_dir: Option<PathBuf>) -> Result<Report> {
    let trash: Box<dyn Trash> = match trash_dir {
        Some(dir) => Box::new(DirectoryTrash::new(dir)),
        None => Box::new(SystemTrash::new()),
    };

    let sync_dir = config.sync_dir()?;
    println!(
        "{} {}",
        "Syncing into".cyan().bold(),
        sync_dir.display().to_string().cyan()
    );

    let report = sync::reconcile(config, force, trash.as_ref()).context("Sync failed")?;

    print_report(&report);
    logger::log_to_file(&format!(
        "sync into {}: {} entries, {} failed",
        sync_dir.display(),
        report.entries.len(),
        report.failures().count()
    ))?;

    println!();
    println!("{}", RELOGIN_NOTICE.yellow());

    Ok(report)
}

/// Handle `unsync`: replace synced symlinks with real copies
pub fn handle_unsync(config: &Config) -> Result<Report> {
    println!("{}", "Unsyncing...".cyan().bold());

    let report = sync::unsync(config);

    print_report(&report);
    logger::log_to_file(&format!(
        "unsync: {} entries, {} failed",
        report.entries.len(),
        report.failures().count()
    ))?;

    Ok(report)
}

/// Handle `status`: show where every sync entry stands
pub fn handle_status(config: &Config, json: bool) -> Result<()> {
    let states = sync::entry_states(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    println!("{}", "=== konsync Status ===".bold().cyan());
    println!("  Sync directory: {}", config.sync_dir()?.display());

    for (section, entries) in group_by_section(&states) {
        println!();
        println!("{}", section.bold());
        for status in entries {
            println!("  {} {}", colored_state(status.state), status.entry);
        }
    }

    Ok(())
}

/// Consecutive runs of entries sharing a section, in config order
fn group_by_section(states: &[EntryStatus]) -> Vec<(&str, Vec<&EntryStatus>)> {
    let mut groups: Vec<(&str, Vec<&EntryStatus>)> = Vec::new();
    for status in states {
        if let Some((section, entries)) = groups.last_mut() {
            if *section == status.section {
                entries.push(status);
                continue;
            }
        }
        groups.push((status.section.as_str(), vec![status]));
    }
    groups
}

fn colored_state(state: EntryState) -> colored::ColoredString {
    let padded = format!("{:<14}", state.as_str());
    let label = padded.as_str();
    match state {
        EntryState::Linked => label.green(),
        EntryState::Absent => label.dimmed(),
        EntryState::LocalOnly | EntryState::StoreOnly => label.cyan(),
        EntryState::Misdirected => label.yellow(),
        EntryState::StaleSymlink | EntryState::BothExist => label.red(),
    }
}

/// Print skips, failures and the tally
pub(crate) fn print_report(report: &Report) {
    for entry in &report.entries {
        match &entry.outcome {
            Outcome::Skipped(reason) => {
                println!("  {} {} ({})", "⊘".yellow(), entry.path.display(), reason.dimmed());
            }
            Outcome::Failed(reason) => {
                println!("  {} {}: {}", "✗".red(), entry.path.display(), reason);
            }
            _ => {}
        }
    }

    println!();
    println!("{}", report.summary_line());
}
