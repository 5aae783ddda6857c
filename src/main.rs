//! drive-pull: move a Google Drive source to a local directory
//!
//! Lists the account's files, folders and shared drives, asks which one to
//! pull and where to put it, then downloads each file, verifies it, and
//! deletes the Drive copy only once the local copy checks out.

mod prompt;

use anyhow::{anyhow, Context, Result};
use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
use bridge_traits::error::BridgeError;
use bridge_traits::http::HttpClient;
use bridge_traits::time::{SystemClock, TokioSleeper};
use core_auth::{AuthError, SessionEstablisher};
use core_runtime::logging::{init_logging, redact_if_sensitive, LoggingConfig};
use core_runtime::{AppConfig, CONFIG_FILE};
use core_transfer::{
    confirm, list_sources, render_menu, select_destination, select_source, Prompter,
    RetryExecutor, RetryPolicy, RunReport, TracingReporter, TransferPipeline,
};
use prompt::{ConsolePrompter, ProgressReporter};
use provider_google_drive::GoogleDriveConnector;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

fn main() -> ExitCode {
    let loaded = AppConfig::load_or_default(CONFIG_FILE);
    let config = loaded.config;

    let logging = LoggingConfig::default()
        .with_level(config.log_level)
        .with_log_file(&config.log_file);
    let guard = match init_logging(logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(warning) = loaded.warning {
        warn!("{}", warning);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build runtime");
            return ExitCode::FAILURE;
        }
    };

    let span = info_span!("run", run_id = %Uuid::new_v4());
    let code = match runtime.block_on(run(config).instrument(span)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    };

    drop(guard);
    code
}

async fn run(config: AppConfig) -> Result<()> {
    info!(
        verify_mode = %config.verify_mode,
        max_retry = config.max_retry,
        "Starting drive-pull"
    );

    let http: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::with_timeout(config.request_timeout)
            .context("Could not create HTTP client")?,
    );

    let session = SessionEstablisher::new(http.clone(), Arc::new(SystemClock))
        .manage(&config.token_file)
        .await
        .context("Could not establish a Google Drive session")?;

    let connector = Arc::new(
        GoogleDriveConnector::with_token_source(http, Arc::new(session))
            .with_timeout(config.request_timeout),
    );

    let account = connector.about().await.map_err(|e| match e {
        BridgeError::Unauthorized(message) => anyhow!(AuthError::AuthenticationFailed(message)),
        other => anyhow!(other).context("Could not reach Google Drive"),
    })?;
    if let Some(email) = &account.email {
        info!(account = %redact_if_sensitive("email", email), "Signed in");
    }

    let sleeper = Arc::new(TokioSleeper);
    let policy = RetryPolicy::from_config(&config);
    let log_reporter = TracingReporter;
    let retry = RetryExecutor::new(policy, sleeper.as_ref(), &log_reporter);

    let sources = list_sources(connector.as_ref(), &retry)
        .await
        .context("Could not list sources")?;
    if sources.is_empty() {
        info!("No sources available.");
        println!("No sources available.");
        return Ok(());
    }

    let mut prompter = ConsolePrompter::new();
    prompter.show(&render_menu(&sources));
    let source = select_source(&mut prompter, &sources)?;

    let fs = Arc::new(TokioFileSystem::new());
    let destination = select_destination(&mut prompter, fs.as_ref(), config.destination_attempts)
        .await
        .context("No usable destination")?;

    if !confirm(&mut prompter, &source, &destination)? {
        info!("Operation cancelled");
        println!("Operation cancelled.");
        return Ok(());
    }

    let pipeline = TransferPipeline::new(
        connector,
        fs,
        sleeper,
        Arc::new(ProgressReporter::new()),
    )
    .with_retry_policy(policy)
    .with_verify_mode(config.verify_mode)
    .with_folder_cleanup(config.delete_empty_folders);

    let report = pipeline.run(&source, &destination).await?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    let summary = &report.summary;
    println!(
        "Deleted {} of {} files from Drive ({} verify failed, {} download failed, {} delete failed)",
        summary.deleted,
        summary.total(),
        summary.verify_failed,
        summary.download_failed,
        summary.delete_failed
    );

    for record in report.records.iter().filter(|r| !r.status.is_success()) {
        println!("  {} [{}]: {}", record.name, record.status, record.detail);
    }

    if summary.folders_removed > 0 {
        println!("Removed {} empty folders", summary.folders_removed);
    }
    if summary.folders_skipped > 0 {
        println!(
            "Skipped {} folders that could not be listed; their files are still on Drive",
            summary.folders_skipped
        );
    }
}
