use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use website_monitoring::{
    actors::coordinator::{MonitorCoordinator, run_all},
    config::{ResolvedTargetConfig, read_config_file},
    http::{HttpClient, ReqwestClient},
    reporter::{LogReporter, Reporter, Reporters, WebhookReporter},
    util::get_log_level,
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (.json or .toml)
    #[arg(short)]
    file: String,
}

fn init() {
    let level = get_log_level();
    let filter = filter::Targets::new().with_targets(vec![
        ("website_monitoring", level),
        ("webmon", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let targets = read_config_file(&args.file)?;

    // targets share nothing: one client and one set of reporters each
    let mut coordinators = vec![];
    let mut histories = vec![];
    for target in targets {
        let client = client_for(&target)?;
        let log = Arc::new(LogReporter::new());
        let reporter = reporter_for(&target, log.clone())?;
        let coordinator = MonitorCoordinator::new(target, client, reporter);
        histories.push((coordinator.target().url.clone(), log));
        coordinators.push(coordinator);
    }

    let cancel = CancellationToken::new();
    let monitors = tokio::spawn(run_all(coordinators, cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("received ctrl-c, shutting down");
    cancel.cancel();

    monitors.await?;

    for (url, log) in histories {
        let history = log.alert_history();
        if history.is_empty() {
            continue;
        }
        info!("{url}: {} alerts raised during this run", history.len());
        for alert in history {
            info!("{alert}");
        }
    }

    Ok(())
}

fn client_for(target: &ResolvedTargetConfig) -> anyhow::Result<Arc<dyn HttpClient>> {
    match target.timeout {
        Some(timeout) => {
            debug!("{}: probes time out after {timeout:?}", target.url);
            Ok(Arc::new(ReqwestClient::with_timeout(timeout)?))
        }
        None => Ok(Arc::new(ReqwestClient::new()?)),
    }
}

fn reporter_for(
    target: &ResolvedTargetConfig,
    log: Arc<LogReporter>,
) -> anyhow::Result<Arc<dyn Reporter>> {
    let mut reporters = Reporters::new().with(log);

    if let Some(webhook) = &target.webhook {
        debug!("{}: alerts are posted to a webhook", target.url);
        reporters = reporters.with(Arc::new(WebhookReporter::new(webhook.clone())?));
    }

    Ok(Arc::new(reporters))
}
