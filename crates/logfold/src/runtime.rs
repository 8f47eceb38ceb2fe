//! Process lifecycle — logging init, wiring, and the shutdown flush.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Args;
use crate::config::MergeConfig;
use crate::event::Event;
use crate::merge::Merger;
use crate::sink;

/// Initialise the tracing / logging subsystem. Diagnostics go to
/// stderr; stdout is the data path.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logfold=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Resolve configuration, open the sink, and merge stdin until end of
/// stream.
pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = MergeConfig::resolve(args)?;
    let sink = sink::open(&config.output).map_err(|err| {
        error!("failed to open output {:?}: {}", config.output, err);
        err
    })?;
    let event = Event::new(sink, config.event_config())?;

    // Best-effort: flush whatever is buffered when the process is asked
    // to terminate mid-event. Racing with the normal shutdown below is
    // harmless, a flush on an empty buffer is a no-op.
    {
        let event = event.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            info!("termination signal received, flushing");
            event.flush().await;
            std::process::exit(1);
        });
    }

    let mut merger = Merger::new(event.clone(), &config);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    merger.run(stdin).await.map_err(|err| {
        error!("input read failed: {}", err);
        err
    })?;
    event.close().await;
    Ok(())
}

async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            tracing::warn!("failed to install SIGTERM handler: {}", err);
            let _ = ctrl_c.await;
        }
    }
}
