pub mod server;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use syslog_tracing::{Facility, Options, Syslog};
use tokio::{
	net::TcpListener,
	signal::unix::{Signal, SignalKind, signal},
	sync::watch,
};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

const DEFAULT_CONFIG: &str = "/etc/sogo/sogodap.toml";

#[derive(Debug, Parser)]
#[command(
	version = sogodap_cli::VERSION,
	rename_all = "kebab",
	styles = sogodap_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE", default_value = DEFAULT_CONFIG)]
	pub config: PathBuf,
	/// Log at debug level regardless of the configured level.
	#[arg(long, short = 'D')]
	pub debug: bool,
	/// Send log output to the system log instead of stderr.
	#[arg(long)]
	pub syslog: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sogodap_config::load(&args.config)?;
	init_tracing(&config, &args)?;
	tracing::info!("{}", sogodap_cli::BANNER);
	let addr: SocketAddr = config.service.listen_bind().parse()?;
	let signals = ShutdownSignals::install()?;
	let state = AppState::new(config).await?;

	let listener = TcpListener::bind(addr).await?;
	tracing::info!(%addr, "LDAP server listening.");
	let (shutdown_tx, shutdown_rx) = watch::channel(false);

	tokio::spawn(async move {
		let name = signals.recv().await;

		tracing::info!(signal = name, "Shutting down.");

		let _ = shutdown_tx.send(true);
	});

	server::serve(listener, state.service, shutdown_rx).await;
	tracing::info!("LDAP server stopped.");
	Ok(())
}

fn init_tracing(config: &sogodap_config::Config, args: &Args) -> color_eyre::Result<()> {
	let directive = if args.debug { "debug" } else { config.service.log_level.as_str() };
	let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

	if args.syslog {
		let syslog = Syslog::new(c"sogodap", Options::LOG_PID, Facility::Daemon)
			.ok_or_else(|| eyre::eyre!("Failed to open the system log."))?;

		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_ansi(false)
			.without_time()
			.with_writer(syslog)
			.init();
	} else {
		tracing_subscriber::fmt().with_env_filter(filter).init();
	}

	Ok(())
}

/// SIGINT, SIGTERM and SIGQUIT all stop the accept loop.
struct ShutdownSignals {
	interrupt: Signal,
	terminate: Signal,
	quit: Signal,
}
impl ShutdownSignals {
	fn install() -> std::io::Result<Self> {
		Ok(Self {
			interrupt: signal(SignalKind::interrupt())?,
			terminate: signal(SignalKind::terminate())?,
			quit: signal(SignalKind::quit())?,
		})
	}

	async fn recv(mut self) -> &'static str {
		tokio::select! {
			_ = self.interrupt.recv() => "SIGINT",
			_ = self.terminate.recv() => "SIGTERM",
			_ = self.quit.recv() => "SIGQUIT",
		}
	}
}
