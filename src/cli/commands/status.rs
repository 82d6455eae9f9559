//! Status command - report manifest and store state

use super::{load_worker, open_storage};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::ShellcacheResult;
use crate::manifest::PersistedManifestRecord;
use crate::store::CacheStorage;
use crate::ui::{self, UiContext};
use serde::Serialize;

/// Presence and size of one of the three stores
#[derive(Debug, Serialize)]
struct StoreStatus {
    role: &'static str,
    name: String,
    present: bool,
    entries: usize,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    origin: String,
    storage: String,
    bundle: Option<String>,
    manifest_resources: Option<usize>,
    core_resources: Option<usize>,
    applied_resources: Option<usize>,
    up_to_date: Option<bool>,
    missing: Option<usize>,
    stores: Vec<StoreStatus>,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> ShellcacheResult<()> {
    let report = collect(config).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_plain(&report),
        OutputFormat::Table => print_table(&report),
    }

    Ok(())
}

async fn collect(config: &Config) -> ShellcacheResult<StatusReport> {
    let worker = match config.worker.bundle {
        Some(_) => Some(load_worker(config).await?.0),
        None => None,
    };
    let storage = match &worker {
        Some(worker) => worker.storage().clone(),
        None => open_storage(config),
    };

    let caches = &config.caches;
    let mut stores = Vec::new();
    for (role, name) in [
        ("content", &caches.content),
        ("temp", &caches.temp),
        ("manifest", &caches.manifest),
    ] {
        stores.push(store_status(&*storage, role, name).await?);
    }

    let applied = if storage.has(&caches.manifest).await? {
        let store = storage.open(&caches.manifest).await?;
        PersistedManifestRecord::load(&*store)
            .await?
            .map(|record| record.manifest)
    } else {
        None
    };

    let (manifest_resources, core_resources, up_to_date, missing) = match &worker {
        Some(worker) => {
            let registry = &worker.config().registry;
            let missing = if storage.has(&caches.content).await? {
                worker.missing_resources().await?.len()
            } else {
                registry.resources().len()
            };
            (
                Some(registry.resources().len()),
                Some(registry.core().len()),
                Some(applied.as_ref() == Some(registry.resources())),
                Some(missing),
            )
        }
        None => (None, None, None, None),
    };

    let storage_desc = match config.storage.backend {
        StorageBackend::Disk => format!("disk ({})", ConfigManager::storage_dir(config).display()),
        StorageBackend::Memory => "memory".to_string(),
    };

    Ok(StatusReport {
        origin: config.worker.origin.clone(),
        storage: storage_desc,
        bundle: config
            .worker
            .bundle
            .as_ref()
            .map(|p| p.display().to_string()),
        manifest_resources,
        core_resources,
        applied_resources: applied.as_ref().map(|m| m.len()),
        up_to_date,
        missing,
        stores,
    })
}

async fn store_status(
    storage: &dyn CacheStorage,
    role: &'static str,
    name: &str,
) -> ShellcacheResult<StoreStatus> {
    let present = storage.has(name).await?;
    let entries = if present {
        storage.open(name).await?.entries().await?.len()
    } else {
        0
    };

    Ok(StoreStatus {
        role,
        name: name.to_string(),
        present,
        entries,
    })
}

fn print_table(report: &StatusReport) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "shellcache status");

    ui::section(&ctx, "Worker:");
    ui::key_value(&ctx, "Origin", &report.origin);
    ui::key_value(&ctx, "Storage", &report.storage);
    match (&report.bundle, report.manifest_resources, report.core_resources) {
        (Some(bundle), Some(resources), Some(core)) => {
            ui::key_value(&ctx, "Bundle", bundle);
            ui::key_value(
                &ctx,
                "Manifest",
                &format!("{} resources, {} core", resources, core),
            );
        }
        _ => ui::step_warn_hint(
            &ctx,
            "No asset bundle configured",
            "Run: shellcache config set worker.bundle <path>",
        ),
    }

    ui::section(&ctx, "Stores:");
    for store in &report.stores {
        let value = if store.present {
            format!("{} ({} entries)", store.name, store.entries)
        } else {
            format!("{} (absent)", store.name)
        };
        ui::key_value_status(&ctx, store.role, &value, store.present || store.role == "temp");
    }

    ui::section(&ctx, "Manifest:");
    match report.applied_resources {
        Some(count) => ui::key_value(&ctx, "Applied", &format!("{} resources", count)),
        None => ui::key_value_status(&ctx, "Applied", "none", false),
    }
    if let Some(up_to_date) = report.up_to_date {
        let value = if up_to_date { "yes" } else { "no" };
        ui::key_value_status(&ctx, "Up to date", value, up_to_date);
        if !up_to_date {
            ui::remark(&ctx, "Run: shellcache update");
        }
    }
    if let Some(missing) = report.missing {
        ui::key_value_status(&ctx, "Missing offline", &missing.to_string(), missing == 0);
    }
}

fn print_plain(report: &StatusReport) {
    println!("origin {}", report.origin);
    for store in &report.stores {
        println!("{} {} {}", store.role, store.name, store.entries);
    }
    if let Some(missing) = report.missing {
        println!("missing {}", missing);
    }
}
