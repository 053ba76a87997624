// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interactive terminal attached to the session container.

use std::io::{IsTerminal, Read};
use std::sync::Arc;

use async_trait::async_trait;
use guestfs_k8s::{AttachedProcess, K8sClient, K8sError, TerminalSize};
use guestfs_session::{AttachError, AttachSession, PodRef};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

const STDIN_CHUNK: usize = 1024;

/// Binds the local terminal to a pod through the attach subresource.
pub struct TerminalAttacher {
	client: Arc<dyn K8sClient>,
}

impl TerminalAttacher {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}
}

#[async_trait]
impl AttachSession for TerminalAttacher {
	#[instrument(skip(self, pod), fields(pod_name = %pod.name, namespace = %pod.namespace))]
	async fn attach(&self, pod: &PodRef, command: &str) -> Result<(), AttachError> {
		let process = self
			.client
			.exec_attach(&pod.name, &pod.namespace, &pod.container)
			.await
			.map_err(|e| AttachError::new(&pod.name, e.to_string()))?;
		debug!(container = %pod.container, "Attached to session container");

		eprintln!("If you don't see a command prompt, try pressing enter.");

		let _raw = RawModeGuard::enable().map_err(|e| {
			AttachError::new(&pod.name, format!("failed to enable raw mode: {e}"))
		})?;

		pump(process, spawn_stdin_reader(), tokio::io::stdout(), terminal_size())
			.await
			.map_err(|e| AttachError::new(&pod.name, e.to_string()))
	}
}

/// Restores cooked mode on drop. A no-op when stdin is not a terminal.
struct RawModeGuard {
	enabled: bool,
}

impl RawModeGuard {
	fn enable() -> std::io::Result<Self> {
		if !std::io::stdin().is_terminal() {
			return Ok(Self { enabled: false });
		}
		crossterm::terminal::enable_raw_mode()?;
		Ok(Self { enabled: true })
	}
}

impl Drop for RawModeGuard {
	fn drop(&mut self) {
		if self.enabled {
			let _ = crossterm::terminal::disable_raw_mode();
		}
	}
}

fn terminal_size() -> Option<TerminalSize> {
	crossterm::terminal::size()
		.ok()
		.map(|(width, height)| TerminalSize { width, height })
}

/// Read local stdin on a dedicated thread.
///
/// A blocking read cannot be cancelled, so the thread is detached rather than
/// owned by the runtime; it exits on EOF or once the receiver is gone.
fn spawn_stdin_reader() -> mpsc::Receiver<Vec<u8>> {
	let (tx, rx) = mpsc::channel(16);
	std::thread::spawn(move || {
		let mut stdin = std::io::stdin().lock();
		let mut buf = [0u8; STDIN_CHUNK];
		loop {
			match stdin.read(&mut buf) {
				Ok(0) | Err(_) => break,
				Ok(n) => {
					if tx.blocking_send(buf[..n].to_vec()).is_err() {
						break;
					}
				}
			}
		}
	});
	rx
}

/// Copy `input` to the remote stdin and the remote stdout to `output` until
/// the remote side closes, then report the remote exit status.
async fn pump<W>(
	process: AttachedProcess,
	mut input: mpsc::Receiver<Vec<u8>>,
	mut output: W,
	size: Option<TerminalSize>,
) -> Result<(), K8sError>
where
	W: AsyncWrite + Unpin,
{
	let AttachedProcess {
		stdin: mut remote_in,
		stdout: mut remote_out,
		resize,
		completion,
	} = process;

	if let (Some(mut resize), Some(size)) = (resize, size) {
		debug!(width = size.width, height = size.height, "Sending terminal size");
		let _ = resize.try_send(size);
	}

	let forward = tokio::spawn(async move {
		while let Some(chunk) = input.recv().await {
			if remote_in.write_all(&chunk).await.is_err() || remote_in.flush().await.is_err() {
				break;
			}
		}
	});

	let copied = tokio::io::copy(&mut remote_out, &mut output).await;
	forward.abort();
	let flushed = output.flush().await;

	completion.await?;
	copied.and(flushed).map_err(|e| K8sError::AttachError {
		message: format!("terminal stream failed: {e}"),
	})?;
	Ok(())
}
