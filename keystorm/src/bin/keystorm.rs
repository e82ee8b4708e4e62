use std::{io, net::SocketAddr, path::PathBuf, process::ExitCode};

use clap::Parser;
use jemallocator::Jemalloc;
use keystorm::{
    config::{self, Config},
    generator::{self, Tcp},
    signals,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::{runtime::Builder, signal};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Generator(#[from] generator::Error),
    #[error("Failed to install prometheus exporter: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// seconds to sleep between cycles, non-integer values are ignored
    #[clap(allow_hyphen_values = true)]
    delay: Option<String>,
    /// path on disk to the configuration file, defaults apply when absent
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// address to bind a prometheus exporter to
    #[clap(long)]
    prometheus_addr: Option<SocketAddr>,
}

fn get_config(cli: &Cli) -> Result<Config, Error> {
    let mut config = Config::load(cli.config_path.as_deref())?;
    if let Some(ref arg) = cli.delay {
        if !config.override_delay(arg) {
            warn!(
                "Ignoring non-integer argument. Using default: {}s",
                config.delay_seconds
            );
        }
    }
    Ok(config)
}

async fn inner_main(config: Config, prometheus_addr: Option<SocketAddr>) -> Result<(), Error> {
    if let Some(addr) = prometheus_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Prometheus exporter listening on {addr}.");
    }

    let (shutdown_watcher, shutdown_broadcast) = signals::signal();
    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for CTRL-c: {err}");
            // Dropping the broadcaster would signal shutdown.
            std::future::pending::<()>().await;
        }
        warn!("Exiting on CTRL-c");
        shutdown_broadcast.signal();
    });

    let mut interrupted = shutdown_watcher.clone();
    let tcp = tokio::select! {
        res = Tcp::connect(&config, shutdown_watcher) => res?,
        () = interrupted.recv() => return Ok(()),
    };
    info!(
        "Generated {} application names, sending every {}s.",
        tcp.graphite().app_names().len(),
        config.delay_seconds
    );
    tcp.spin().await?;
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config = get_config(cli)?;
    let runtime = Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    runtime.block_on(inner_main(config, cli.prometheus_addr))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(io::stderr.with_max_level(Level::WARN).or_else(io::stdout))
        .finish()
        .init();

    let cli = Cli::parse();
    let version = env!("CARGO_PKG_VERSION");
    info!("Starting keystorm {version} run.");

    match run(&cli) {
        Ok(()) => {
            info!("Bye. :)");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
