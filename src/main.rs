//! upgrade-post-checker entry point.
//!
//! Parses options, sets up logging, runs the post-upgrade checks once and
//! maps the outcome to the process exit code.

use std::process::ExitCode;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use upgrade_post_checker::config::CheckerConfig;
use upgrade_post_checker::logging;
use upgrade_post_checker::service::run_post_upgrade_checks;

#[tokio::main]
async fn main() -> ExitCode {
    // Help and version exit inside load(), before the log file is touched.
    let config = match CheckerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("upgrade-post-checker: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_file) {
        eprintln!("upgrade-post-checker: {e}");
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("post-upgrade check failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &CheckerConfig) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.connection.host,
        port = config.connection.port,
        user = %config.connection.user,
        modules = ?config.modules,
        target_version = %config.plan.target_version,
        log_file = %config.log_file.display(),
        "parameters from cmd"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling current check");
            interrupt.cancel();
        }
    });

    let report = run_post_upgrade_checks(config, &cancel)
        .await
        .with_context(|| {
            format!(
                "checking {}:{}",
                config.connection.host, config.connection.port
            )
        })?;

    tracing::info!(
        steps = report.completed.len(),
        attempts = report.attempts,
        "all post-upgrade checks passed"
    );
    Ok(())
}
