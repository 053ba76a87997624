// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded wait for a session pod to reach the Running phase.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use guestfs_k8s::{K8sClient, Pod};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::PollConfig;
use crate::error::SessionError;
use crate::types::PodRef;

const PHASE_RUNNING: &str = "Running";
const PHASE_SUCCEEDED: &str = "Succeeded";
const PHASE_FAILED: &str = "Failed";
const PHASE_UNKNOWN: &str = "Unknown";

/// Polls a pod until it runs, the timeout elapses, or the caller cancels.
pub struct ReadinessWatcher {
	client: Arc<dyn K8sClient>,
	poll: PollConfig,
}

impl ReadinessWatcher {
	pub fn new(client: Arc<dyn K8sClient>, poll: PollConfig) -> Self {
		Self { client, poll }
	}

	/// Wait until `pod` reports phase Running.
	///
	/// Polling happens on one background task. Whichever of readiness,
	/// timeout, or cancellation fires first decides the result; the poll
	/// task is cancelled and joined before this returns, so no poll is
	/// issued afterwards.
	#[instrument(skip(self, cancel), fields(pod_name = %pod.name, namespace = %pod.namespace))]
	pub async fn wait_running(
		&self,
		pod: &PodRef,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<(), SessionError> {
		let poll_token = cancel.child_token();
		let mut task = tokio::spawn(poll_until_running(
			Arc::clone(&self.client),
			pod.clone(),
			self.poll.clone(),
			poll_token.clone(),
		));

		let (outcome, joined) = tokio::select! {
			joined = &mut task => {
				let outcome = match joined {
					Ok(result) => result,
					Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
					Err(_) => Err(SessionError::Cancelled),
				};
				(outcome, true)
			}
			_ = tokio::time::sleep(timeout) => {
				(Err(SessionError::Timeout { pod: pod.name.clone() }), false)
			}
			_ = cancel.cancelled() => (Err(SessionError::Cancelled), false),
		};

		poll_token.cancel();
		if !joined {
			if let Err(e) = task.await {
				if e.is_panic() {
					std::panic::resume_unwind(e.into_panic());
				}
			}
		}

		match &outcome {
			Ok(()) => info!("Pod is running"),
			Err(e) => debug!(error = %e, "Stopped waiting for pod"),
		}
		outcome
	}
}

async fn poll_until_running(
	client: Arc<dyn K8sClient>,
	pod: PodRef,
	poll: PollConfig,
	token: CancellationToken,
) -> Result<(), SessionError> {
	let mut attempt: u32 = 0;
	let mut reported = HashSet::new();

	loop {
		let fetched = tokio::select! {
			biased;
			_ = token.cancelled() => return Err(SessionError::Cancelled),
			fetched = client.get_pod(&pod.name, &pod.namespace) => fetched,
		};

		match fetched {
			Ok(current) => match pod_phase(&current) {
				PHASE_RUNNING => return Ok(()),
				phase @ (PHASE_SUCCEEDED | PHASE_FAILED) => {
					return Err(SessionError::PodNotRunning {
						pod: pod.name.clone(),
						phase: phase.to_string(),
					})
				}
				phase => {
					debug!(phase, attempt, "Pod not running yet");
					report_waiting_containers(&current, &mut reported);
				}
			},
			// Transient: the pod may not be visible yet, or the API hiccuped.
			Err(e) => debug!(error = %e, attempt, "Failed to fetch pod status"),
		}

		let delay = poll.delay(attempt);
		attempt = attempt.saturating_add(1);
		tokio::select! {
			biased;
			_ = token.cancelled() => return Err(SessionError::Cancelled),
			_ = tokio::time::sleep(delay) => {}
		}
	}
}

fn pod_phase(pod: &Pod) -> &str {
	pod
		.status
		.as_ref()
		.and_then(|s| s.phase.as_deref())
		.unwrap_or(PHASE_UNKNOWN)
}

/// Log each distinct container waiting reason once.
fn report_waiting_containers(pod: &Pod, reported: &mut HashSet<(String, String)>) {
	let statuses = pod
		.status
		.as_ref()
		.and_then(|s| s.container_statuses.as_ref());

	for status in statuses.into_iter().flatten() {
		let Some(waiting) = status.state.as_ref().and_then(|s| s.waiting.as_ref()) else {
			continue;
		};
		let reason = waiting.reason.clone().unwrap_or_default();
		if reported.insert((status.name.clone(), reason.clone())) {
			info!(
				container = %status.name,
				reason = %reason,
				message = %waiting.message.as_deref().unwrap_or_default(),
				"Waiting for container to start"
			);
		}
	}
}
