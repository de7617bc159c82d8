//! Commands shared by the one-shot `takebin` binary and the `cli-catalog`
//! shell.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Subcommand;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog_store::{CatalogError, CatalogResult, EntityKind, ProjectContext, TakeStatus};
use crate::config::{AppConfig, LogVerbosity};
use crate::cli_style::{
    print_empty_list, print_error, print_info, print_key_value, print_list_item,
    print_section_footer, print_section_header, print_success, print_warning, TableBuilder,
};
use crate::history::{DispatchOutcome, HistoryController, HistoryEntry, LogLevel, SnapshotEntry};

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(level: LogVerbosity) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(level.to_filter().into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")
}

pub fn open_controller(config: &AppConfig) -> Result<HistoryController> {
    let root = config.project_root();
    info!("Opening project {:?}...", root);
    let ctx = ProjectContext::open(&root, config.journal.clone())
        .with_context(|| format!("Could not open project at {:?}", root))?;
    HistoryController::open(ctx).with_context(|| format!("Could not load catalog at {:?}", root))
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    EntityKind::parse(&s.to_lowercase()).ok_or_else(|| {
        let known: Vec<&str> = EntityKind::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown kind '{}', expected one of: {}", s, known.join(", "))
    })
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Shows how many records of each kind the project holds.
    Stats,

    /// Lists the records of one kind.
    List {
        #[clap(value_parser = parse_kind)]
        kind: EntityKind,
    },

    /// Runs the integrity audit over the whole catalog.
    Check,

    /// Shows the history feed, newest first.
    History {
        #[clap(long, short, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Undoes the operation recorded under the given history entry.
    Undo { entry_id: String },

    /// Re-applies an undone operation.
    Redo { entry_id: String },

    /// Deletes a record together with everything it owns.
    Delete {
        #[clap(value_parser = parse_kind)]
        kind: EntityKind,
        id: String,
    },

    /// Renames an actor, scene, bin or media item.
    Rename {
        #[clap(value_parser = parse_kind)]
        kind: EntityKind,
        id: String,
        name: String,
    },

    /// Marks a record as complete, or incomplete with --undo.
    Complete {
        #[clap(value_parser = parse_kind)]
        kind: EntityKind,
        id: String,
        #[clap(long)]
        undo: bool,
    },

    /// Approves a take.
    Approve { take_id: String },

    /// Rejects a take.
    Reject { take_id: String },

    /// Lists the snapshot journal.
    Snapshots,

    /// Rewrites every record file from a snapshot.
    RestoreSnapshot { snapshot_id: String },

    /// Adds an informational note to the history feed.
    Note { message: String },
}

pub fn run(command: ConsoleCommand, controller: &HistoryController) -> CatalogResult<()> {
    match command {
        ConsoleCommand::Stats => show_stats(controller),
        ConsoleCommand::List { kind } => show_list(controller, kind),
        ConsoleCommand::Check => show_check(controller),
        ConsoleCommand::History { limit } => {
            let entries = controller.history()?;
            print_section_header("History");
            let rows = history_rows(&entries, limit);
            if rows.is_empty() {
                print_empty_list("No history yet");
            } else {
                let mut table = TableBuilder::new(vec!["Id", "When", "Type", "State", "Message"]);
                for row in rows {
                    table.add_row(row);
                }
                table.print();
            }
            print_section_footer();
            Ok(())
        }
        ConsoleCommand::Undo { entry_id } => {
            report_outcome(&controller.undo(&entry_id)?);
            Ok(())
        }
        ConsoleCommand::Redo { entry_id } => {
            report_outcome(&controller.redo(&entry_id)?);
            Ok(())
        }
        ConsoleCommand::Delete { kind, id } => {
            report_outcome(&controller.delete(kind, &id)?);
            Ok(())
        }
        ConsoleCommand::Rename { kind, id, name } => {
            report_outcome(&controller.rename(kind, &id, &name)?);
            Ok(())
        }
        ConsoleCommand::Complete { kind, id, undo } => {
            report_outcome(&controller.set_complete(kind, &id, !undo)?);
            Ok(())
        }
        ConsoleCommand::Approve { take_id } => {
            report_outcome(&controller.set_take_status(&take_id, TakeStatus::Approved)?);
            Ok(())
        }
        ConsoleCommand::Reject { take_id } => {
            report_outcome(&controller.set_take_status(&take_id, TakeStatus::Rejected)?);
            Ok(())
        }
        ConsoleCommand::Snapshots => {
            let snapshots = controller.snapshots()?;
            print_section_header("Snapshots");
            if snapshots.is_empty() {
                print_empty_list("The journal is empty");
            } else {
                let mut table = TableBuilder::new(vec!["Id", "When", "Records", "Before"]);
                for snapshot in snapshots.iter().rev() {
                    table.add_row(snapshot_row(snapshot));
                }
                table.print();
            }
            print_section_footer();
            Ok(())
        }
        ConsoleCommand::RestoreSnapshot { snapshot_id } => {
            let message = controller.restore_snapshot(&snapshot_id)?;
            print_success(&message);
            Ok(())
        }
        ConsoleCommand::Note { message } => {
            let id = controller.log(LogLevel::Info, &message, None)?;
            print_info(&format!("Noted as {}", id));
            Ok(())
        }
    }
}

fn show_stats(controller: &HistoryController) -> CatalogResult<()> {
    let catalog = controller.catalog()?;
    print_section_header("Catalog");
    let mut table = TableBuilder::new(vec!["Kind", "Records"]);
    for kind in EntityKind::ALL {
        table.add_row(vec![kind.plural().to_string(), catalog.count(kind).to_string()]);
    }
    table.print();
    print_key_value("History entries", &controller.history()?.len().to_string());
    print_key_value("Snapshots", &controller.snapshots()?.len().to_string());
    print_section_footer();
    Ok(())
}

fn show_list(controller: &HistoryController, kind: EntityKind) -> CatalogResult<()> {
    let catalog = controller.catalog()?;
    let records = catalog.records(kind);
    print_section_header(kind.plural());
    if records.is_empty() {
        print_empty_list(&format!("No {}", kind.plural()));
    } else {
        let mut table = TableBuilder::new(vec!["Id", "Name"]);
        for record in records {
            table.add_row(vec![record.id().to_string(), record.display_name()]);
        }
        table.print();
    }
    print_section_footer();
    Ok(())
}

fn show_check(controller: &HistoryController) -> CatalogResult<()> {
    let report = controller.check()?;
    if report.is_clean() {
        print_success(&format!("No problems in {} records", report.checked));
        return Ok(());
    }
    print_warning(&format!(
        "{} problems in {} records",
        report.problems.len(),
        report.checked
    ));
    let mut table = TableBuilder::new(vec!["Record", "Problem"]);
    for problem in &report.problems {
        table.add_row(vec![problem.entity.to_string(), problem.error.to_string()]);
    }
    table.print();
    Ok(())
}

pub fn report_outcome(outcome: &DispatchOutcome) {
    if outcome.success {
        print_success(&outcome.message);
    } else {
        print_warning(&outcome.message);
    }
    print_key_value("Entry", &outcome.entry_id);
}

/// Prints an error and, for validation failures, each violation.
pub fn report_error(err: &CatalogError) {
    match err {
        CatalogError::Validation(errors) => {
            print_error("Validation failed");
            for error in errors {
                print_list_item(&error.to_string(), 1);
            }
        }
        other => print_error(&other.to_string()),
    }
}

fn short_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn history_rows(entries: &[HistoryEntry], limit: usize) -> Vec<Vec<String>> {
    entries
        .iter()
        .rev()
        .take(limit)
        .map(|entry| {
            let state = match entry {
                HistoryEntry::Operation { undone: true, .. } => "undone".to_string(),
                HistoryEntry::Operation { .. } => "applied".to_string(),
                HistoryEntry::Undo { target_id, .. } | HistoryEntry::Redo { target_id, .. } => {
                    format!("of {}", target_id)
                }
                HistoryEntry::Log { level, .. } => level.to_string(),
            };
            vec![
                entry.id().to_string(),
                short_time(entry.created_at()),
                entry.label().to_string(),
                state,
                entry.message().to_string(),
            ]
        })
        .collect()
}

fn snapshot_row(snapshot: &SnapshotEntry) -> Vec<String> {
    let total: usize = snapshot.counts().iter().sum();
    vec![
        snapshot.id.clone(),
        short_time(&snapshot.created_at),
        total.to_string(),
        snapshot.message.clone(),
    ]
}
