// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! guestfs - interactive libguestfs shell bound to a PersistentVolumeClaim
//!
//! Starts a short-lived pod that mounts (filesystem claims) or attaches
//! (block claims) the volume, drops the terminal into a shell inside it, and
//! deletes the pod when the shell exits.

mod attach;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use guestfs_k8s::{K8sClient, KubeClient};
use guestfs_session::{
	CancellationToken, SessionOrchestrator, SessionRequest, VolumeClaimRef, DEFAULT_COMMAND,
};

use attach::TerminalAttacher;
use config::{load_config_with_cli, CliOverrides, LogFormat, LoggingConfig};

/// Open a libguestfs shell on a PersistentVolumeClaim
#[derive(Parser, Debug)]
#[command(name = "guestfs", version, about, long_about = None)]
struct Args {
	/// Name of the PersistentVolumeClaim to inspect
	#[arg(short, long)]
	pvc: String,

	/// Container image with the libguestfs tools (overrides config)
	#[arg(short, long)]
	image: Option<String>,

	/// Namespace of the claim (defaults to the kubeconfig context namespace)
	#[arg(short, long)]
	namespace: Option<String>,

	/// Seconds to wait for the pod to start
	#[arg(long, value_name = "SECS")]
	timeout: Option<u64>,

	/// Do not request a KVM device; libguestfs falls back to emulation
	#[arg(long)]
	no_kvm: bool,

	/// Path to custom configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long)]
	json_logs: bool,
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		Self {
			namespace: args.namespace.clone(),
			image: args.image.clone(),
			ready_timeout_secs: args.timeout,
			no_kvm: args.no_kvm,
			log_level: args.log_level.clone(),
			log_format: args.json_logs.then(|| "json".to_string()),
			config_file: args.config.clone(),
		}
	}
}

/// Logs go to stderr; stdout belongs to the attached shell.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("guestfs={}", logging.level.as_str())));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().pretty().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn setup_ctrlc_handler(cancel: CancellationToken) -> Result<()> {
	ctrlc::set_handler(move || {
		info!("received Ctrl+C, cancelling session");
		cancel.cancel();
	})
	.context("failed to set Ctrl+C handler")?;

	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config =
		load_config_with_cli(CliOverrides::from(&args)).context("failed to load configuration")?;
	init_tracing(&config.logging);

	let kube = KubeClient::new()
		.await
		.context("failed to initialize Kubernetes client")?;
	let namespace = config
		.namespace
		.clone()
		.unwrap_or_else(|| kube.default_namespace().to_string());

	let request = SessionRequest {
		claim: VolumeClaimRef::new(&args.pvc, namespace),
		image: config.image.clone(),
		command: DEFAULT_COMMAND.to_string(),
		args: Vec::new(),
	};

	let client: Arc<dyn K8sClient> = Arc::new(kube);
	let attacher = Arc::new(TerminalAttacher::new(Arc::clone(&client)));
	let orchestrator = SessionOrchestrator::new(client, attacher, config.session.clone());

	let cancel = CancellationToken::new();
	setup_ctrlc_handler(cancel.clone())?;

	info!(
		pvc = %request.claim.name,
		namespace = %request.claim.namespace,
		image = %request.image,
		kvm = config.session.kvm,
		"Starting guestfs session"
	);

	let outcome = orchestrator.run(&request, &cancel).await;
	if let Some(cleanup) = &outcome.cleanup_error {
		warn!(error = %cleanup, "guestfs pod was not cleaned up");
		eprintln!("warning: {cleanup}");
	}

	outcome.into_result()?;
	Ok(())
}
