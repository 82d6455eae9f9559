//! Message command - post a control-channel message to the worker

use super::load_worker;
use crate::cli::args::MessageArgs;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::host::{LifecycleState, Registration};
use crate::ui::{self, TaskSpinner, UiContext};
use crate::worker::{ControlMessage, MessageOutcome, Worker};

/// Execute the message command
pub async fn execute(args: MessageArgs, config: &Config) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let (worker, registration) = load_worker(config).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    match ControlMessage::parse(&args.signal) {
        ControlMessage::ForceActivate => {
            let state = force_activate(&worker, &registration).await?;
            report_activation(&ctx, state);
            return Ok(());
        }
        ControlMessage::HydrateOffline => {
            spinner.start("Downloading resources for offline use...");
        }
        ControlMessage::Unknown(_) => {}
    }

    // Handled directly so the hydration report can be shown
    let outcome = match worker.handle_message(&args.signal).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Offline download failed; nothing was stored");
            return Err(e);
        }
    };

    match outcome {
        MessageOutcome::SkipWaitingRequested => ui::step_ok(&ctx, "Skip-waiting requested"),
        MessageOutcome::Hydrated(report) if report.fetched == 0 => {
            spinner.stop("Everything is already available offline");
        }
        MessageOutcome::Hydrated(report) => {
            spinner.stop(&format!("Downloaded {} resources", report.fetched));
        }
        MessageOutcome::Ignored => {
            ui::step_warn_hint(
                &ctx,
                &format!("Unknown message {:?} ignored", args.signal),
                "Known messages: skipWaiting, downloadOffline",
            );
        }
    }

    Ok(())
}

/// Post skip-waiting through the registration, activating a waiting generation
async fn force_activate(
    worker: &Worker,
    registration: &Registration,
) -> ShellcacheResult<Option<LifecycleState>> {
    registration
        .post_message(worker, ControlMessage::ForceActivate.as_wire())
        .await
}

fn report_activation(ctx: &UiContext, state: Option<LifecycleState>) {
    match state {
        Some(LifecycleState::Activated) => ui::step_ok(ctx, "Waiting generation activated"),
        Some(state) => ui::step_warn(ctx, &format!("Generation is {}", state)),
        None => {
            ui::step_ok(ctx, "Skip-waiting requested");
            ui::remark(ctx, "No generation is waiting in this process");
            ui::remark(ctx, "shellcache update installs and activates in one step");
        }
    }
}
