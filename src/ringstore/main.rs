//! The `ringstore` server binary: loads configuration, boots the
//! coordinator, and serves the HTTP/JSON surface (spec §6).

#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use ringstore_api::{serve, Context};
use ringstore_coordinator::Coordinator;
use ringstore_membership::Membership;
use ringstore_store::Store;
use ringstore_util::config::read_config;
use ringstore_util::error::Error;

#[derive(Parser, Debug)]
#[command(
	name = "ringstore",
	about = "Horizontally distributed, in-memory key-value store with consistent-hash replication"
)]
struct Opt {
	/// Path to the node's TOML configuration file.
	#[arg(short, long, default_value = "ringstore.toml")]
	config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
	let opt = Opt::parse();

	if std::env::var("RUST_LOG").is_err() {
		std::env::set_var("RUST_LOG", "ringstore=info");
	}
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
		.init();

	if let Err(e) = run(opt).await {
		eprintln!("Error: {}", e);
		return ExitCode::FAILURE;
	}
	ExitCode::SUCCESS
}

async fn run(opt: Opt) -> Result<(), Error> {
	let config = read_config(&opt.config)?;
	let bind_addr: SocketAddr = format!("{}:{}", config.host, config.port)
		.parse()
		.map_err(|e| Error::Message(format!("Invalid host/port {}:{}: {}", config.host, config.port, e)))?;

	let membership = Arc::new(Membership::new(
		config.node_id.clone(),
		config.address(),
		config.peer_rpc_timeout_ms,
	));
	let store = Arc::new(Store::new());
	let coordinator = Arc::new(Coordinator::new(
		store,
		membership.clone(),
		config.replication_factor,
		config.peer_rpc_timeout_ms,
	));

	if let Some(seed) = config.seed.clone() {
		let joiner = membership.clone();
		tokio::spawn(async move {
			if let Err(e) = joiner.join_cluster(&seed).await {
				warn!("Failed to join cluster via {}: {}", seed, e);
			}
		});
	}

	info!(
		"Starting node {} on {}, replication_factor={}",
		config.node_id,
		config.address(),
		config.replication_factor
	);

	let ctx = Arc::new(Context { coordinator });
	serve(bind_addr, ctx).await
}
