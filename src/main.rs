use std::future::Future;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use env_logger::Env;
use tokio::io::{AsyncBufRead, BufReader};

pub mod cert_probe;
use cert_probe::{describe, prelude::*};
pub mod config;
use config::app_config::{load_settings, setup_resolver, setup_tls_connector};
pub mod domains;
use domains::read_domains;
pub mod error;
use error::AppError;
pub mod notify;
use notify::{Mailer, Notifier};
pub mod report;
use report::{MAIL_SUBJECT, Report};

/// Mails a report when the TLS certificates of the domains listed on stdin
/// are about to expire, have expired, or cannot be read.
#[derive(Parser, Debug)]
#[command(name = "notafter", version, about, long_about = None)]
#[command(override_usage = "notafter <RECIPIENT> < domains.txt")]
struct Cli {
    /// Recipient of the report mail
    recipient: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // logs go to stderr, stdout is reserved for the report
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(&cli.recipient).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("notafter: {}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(recipient: &str) -> Result<(), AppError> {
    let settings = load_settings()?;

    let prober = Arc::new(Prober::new(
        setup_tls_connector()?,
        setup_resolver(&settings.dns_hosts)?,
        settings.port,
        settings.timeout(),
    ));
    let mailer = Mailer::new(&settings.mail_command, MAIL_SUBJECT);

    check_domains(
        BufReader::new(tokio::io::stdin()),
        &mut std::io::stdout(),
        |domain| {
            let prober = Arc::clone(&prober);
            async move { prober.probe(&domain).await }
        },
        &mailer,
        recipient,
        settings.threshold(),
    )
    .await
}

/// Reads the domain list, probes every domain and, if anything needs attention,
/// writes the report to `out` and hands it to `notifier`.
///
/// Nothing is probed when the list is empty. A failing write to `out` is logged and
/// does not prevent delivery.
async fn check_domains<R, W, F, Fut, N>(
    input: R,
    out: &mut W,
    probe: F,
    notifier: &N,
    recipient: &str,
    threshold: chrono::Duration,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<DateTime<Utc>, ProbeError>> + Send + 'static,
    N: Notifier,
{
    let now = Utc::now();

    let domains = read_domains(input).await.map_err(AppError::ReadDomains)?;
    if domains.is_empty() {
        // an empty list is almost always a broken cron entry
        return Err(AppError::NoDomains);
    }
    log::info!("Probing {} domains", domains.len());

    let results = probe_all(&domains, probe).await;

    let report = Report::new(&results, now, threshold);
    if !report.needs_notify() {
        log::info!(
            "All certificates are valid for more than {} days",
            threshold.num_days()
        );
        return Ok(());
    }

    let body = report.render();
    if let Err(e) = out.write_all(body.as_bytes()).and_then(|()| out.flush()) {
        log::warn!("Failed to write report to stdout: {e}");
    }

    notifier.send(recipient, &body).await?;
    Ok(())
}
