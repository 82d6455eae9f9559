//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, StorageBackend};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::Origin;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: [&str; 8] = [
    "general.log_format",
    "worker.origin",
    "worker.bundle",
    "storage.backend",
    "storage.dir",
    "caches.temp",
    "caches.content",
    "caches.manifest",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> ShellcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> ShellcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        ui::step_error_detail(&ctx, "Cannot set config key", key);
        ui::remark(&ctx, "Valid keys:");
        for key in VALID_KEYS {
            ui::remark(&ctx, &format!("  {}", key));
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Set one dotted key, validating the value for its field
fn apply(config: &mut Config, key: &str, value: &str) -> ShellcacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            if !matches!(value, "text" | "json") {
                return Err(ShellcacheError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )));
            }
            config.general.log_format = value.to_string();
        }

        ["worker", "origin"] => {
            config.worker.origin = Origin::parse(value)?.as_str().to_string();
        }
        ["worker", "bundle"] => config.worker.bundle = Some(PathBuf::from(value)),

        ["storage", "backend"] => config.storage.backend = parse_backend(value)?,
        ["storage", "dir"] => config.storage.dir = Some(PathBuf::from(value)),

        ["caches", "temp"] => config.caches.temp = value.to_string(),
        ["caches", "content"] => config.caches.content = value.to_string(),
        ["caches", "manifest"] => config.caches.manifest = value.to_string(),

        _ => return Err(ShellcacheError::User(format!("Unknown config key: {}", key))),
    }

    config.caches.validate()
}

fn parse_backend(value: &str) -> ShellcacheResult<StorageBackend> {
    match value.to_lowercase().as_str() {
        "disk" => Ok(StorageBackend::Disk),
        "memory" => Ok(StorageBackend::Memory),
        _ => Err(ShellcacheError::User(format!(
            "Invalid storage backend: {}. Use disk/memory",
            value
        ))),
    }
}
