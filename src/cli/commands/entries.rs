//! Entries command - list what the cache stores hold

use super::open_storage;
use crate::cli::args::{EntriesArgs, OutputFormat};
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct EntryRow {
    store: String,
    key: String,
    status: u16,
    size_bytes: u64,
    stored_at: DateTime<Utc>,
}

/// Execute the entries command
pub async fn execute(args: EntriesArgs, config: &Config) -> ShellcacheResult<()> {
    let storage = open_storage(config);

    let names = match args.store {
        Some(name) => {
            if !storage.has(&name).await? {
                return Err(ShellcacheError::User(format!("No store named {}", name)));
            }
            vec![name]
        }
        None => storage.names().await?,
    };

    let mut rows = Vec::new();
    for name in names {
        let store = storage.open(&name).await?;
        rows.extend(store.entries().await?.into_iter().map(|entry| EntryRow {
            store: name.clone(),
            key: entry.key,
            status: entry.status,
            size_bytes: entry.size_bytes,
            stored_at: entry.stored_at,
        }));
    }

    if rows.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cached entries");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.key);
            }
        }
    }

    Ok(())
}

fn print_table(rows: &[EntryRow]) {
    println!(
        "{:<16} {:<6} {:>10} {:<17} {}",
        style("STORE").bold(),
        style("STATUS").bold(),
        style("SIZE").bold(),
        style("STORED").bold(),
        style("KEY").bold()
    );
    println!("{}", "-".repeat(80));

    for row in rows {
        let status = if (200..300).contains(&row.status) {
            style(row.status.to_string()).green()
        } else {
            style(row.status.to_string()).yellow()
        };
        println!(
            "{:<16} {:<6} {:>10} {:<17} {}",
            row.store,
            status,
            row.size_bytes,
            row.stored_at.format("%Y-%m-%d %H:%M"),
            row.key
        );
    }

    println!();
    println!("{} entr{}", rows.len(), if rows.len() == 1 { "y" } else { "ies" });
}
