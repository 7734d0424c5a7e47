//! treewatch: report entries created and deleted under a directory, down to
//! a fixed depth, until every watched directory is gone.

mod cli;
mod logging;
mod output;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::info;
use treewatch_core::{DispatchStats, WatchConfig};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cli.watch_config()?;
    logging::init(&config.log_filter);

    config
        .validate()
        .with_context(|| format!("cannot watch {}", config.root.display()))?;

    // The dispatch loop blocks on reads, so it gets its own thread. It is not
    // joined: on Ctrl-C the process exits and the kernel drops the watches.
    let (tx, rx) = oneshot::channel();
    let json = cli.json;
    std::thread::spawn(move || {
        let _ = tx.send(watch(&config, json));
    });

    tokio::select! {
        result = rx => {
            let stats = result.context("watch thread exited unexpectedly")??;
            info!(
                "Done: {} batches, {} records, {} watches installed, {} removed, {} anomalies",
                stats.batches, stats.records, stats.installed, stats.removed, stats.anomalies
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn watch(config: &WatchConfig, json: bool) -> anyhow::Result<DispatchStats> {
    use treewatch_core::{Dispatcher, InotifySource};

    info!("Attempting to open directory: {}", config.root.display());
    let source = InotifySource::open(config.read_buffer_size)?;
    let mut dispatcher = Dispatcher::new(source, config);
    dispatcher.start(&config.root)?;

    if !json {
        println!(
            "Watching directory: {} and its subdirectories up to depth: {}",
            config.root.display(),
            config.max_depth
        );
    }

    let mut sink = output::StdoutSink::new(json);
    let stats = dispatcher.run(&mut sink)?;
    dispatcher.shutdown().close()?;
    Ok(stats)
}

#[cfg(not(target_os = "linux"))]
fn watch(_config: &WatchConfig, _json: bool) -> anyhow::Result<DispatchStats> {
    anyhow::bail!("treewatch requires inotify and only runs on Linux")
}
