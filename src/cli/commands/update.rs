//! Update command - install and activate a new worker generation

use super::load_worker;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::host::LifecycleState;
use crate::manifest::ResourceManifest;
use crate::ui::{self, TaskSpinner, UiContext};

/// How the new manifest relates to the applied one
#[derive(Debug, Default, PartialEq, Eq)]
struct ManifestDelta {
    unchanged: usize,
    changed: usize,
    added: usize,
    removed: usize,
}

impl ManifestDelta {
    fn between(previous: &ResourceManifest, next: &ResourceManifest) -> Self {
        let mut delta = Self::default();
        for key in next.keys() {
            if next.is_unchanged_since(previous, key) {
                delta.unchanged += 1;
            } else if previous.contains(key) {
                delta.changed += 1;
            } else {
                delta.added += 1;
            }
        }
        delta.removed = previous.keys().filter(|key| !next.contains(key)).count();
        delta
    }
}

/// Execute the update command
pub async fn execute(config: &Config) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let (worker, registration) = load_worker(config).await?;
    let previous = worker.applied_manifest().await?;
    let registry = &worker.config().registry;

    ui::intro(&ctx, "shellcache update");
    ui::key_value(&ctx, "Origin", worker.config().origin.as_str());
    ui::key_value(&ctx, "Generation", &worker.generation().to_string());
    ui::key_value(
        &ctx,
        "Manifest",
        &format!(
            "{} resources, {} core",
            registry.resources().len(),
            registry.core().len()
        ),
    );

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Installing core resources...");

    let state = match registration.update(&worker).await {
        Ok(state) => state,
        Err(e) => {
            spinner.stop_error("Install failed; the previous generation stays active");
            return Err(e);
        }
    };

    match state {
        LifecycleState::Activated => spinner.stop("Worker activated"),
        LifecycleState::Reset => {
            spinner.stop_warn("Activation failed; every cache was reset");
            ui::remark(&ctx, "Resources will be fetched again on demand");
            return Ok(());
        }
        other => {
            spinner.stop_warn(&format!("Worker is {}", other));
            return Ok(());
        }
    }

    match previous {
        Some(previous) => {
            let delta = ManifestDelta::between(&previous, registry.resources());
            ui::section(&ctx, "Changes");
            ui::key_value(&ctx, "Kept", &delta.unchanged.to_string());
            ui::key_value(&ctx, "Changed", &delta.changed.to_string());
            ui::key_value(&ctx, "Added", &delta.added.to_string());
            ui::key_value(&ctx, "Removed", &delta.removed.to_string());
        }
        None => ui::step_info(&ctx, "First activation; content cache started fresh"),
    }

    let missing = worker.missing_resources().await?;
    if missing.is_empty() {
        ui::outro_success(&ctx, "All resources available offline");
    } else {
        ui::step_warn_hint(
            &ctx,
            &format!("{} resources not cached yet", missing.len()),
            "Run: shellcache message downloadOffline",
        );
    }

    Ok(())
}
