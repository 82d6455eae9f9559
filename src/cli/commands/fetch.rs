//! Fetch command - route one request through the worker

use super::load_worker;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::{Fetcher, HttpFetcher, Method, Request, Response};
use crate::ui::{self, UiContext};
use crate::worker::FetchOutcome;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let (worker, _registration) = load_worker(config).await?;

    let method = match args.method.parse::<Method>() {
        Ok(method) => method,
        Err(never) => match never {},
    };
    let request = Request::new(method, worker.config().origin.resolve(&args.target));

    let (response, source) = match worker.handle_fetch(&request).await? {
        FetchOutcome::Respond { response, source } => (response, source.to_string()),
        FetchOutcome::Passthrough => {
            let response = HttpFetcher::new().fetch(&request).await?;
            (response, "passthrough".to_string())
        }
    };

    ui::key_value(&ctx, "Request", &format!("{} {}", request.method, request.url));
    ui::key_value_status(&ctx, "Status", &response.status.to_string(), response.is_ok());
    ui::key_value(&ctx, "Source", &source);
    ui::key_value(&ctx, "Size", &format!("{} bytes", response.body.len()));
    if let Some(content_type) = response.header("content-type") {
        ui::key_value(&ctx, "Content-Type", content_type);
    }

    if let Some(path) = args.output {
        write_body(&response, &path).await?;
        ui::step_ok_detail(&ctx, "Body written", &path.display().to_string());
    }

    Ok(())
}

async fn write_body(response: &Response, path: &std::path::Path) -> ShellcacheResult<()> {
    fs::write(path, &response.body)
        .await
        .map_err(|e| ShellcacheError::io(format!("writing {}", path.display()), e))
}
