// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session lifecycle: validate, create, wait, attach, and always clean up.

use std::future::Future;
use std::sync::Arc;

use guestfs_k8s::{K8sClient, K8sError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::attach::AttachSession;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::inspector::ClaimInspector;
use crate::pod_spec::{build_pod_spec, mount_location, CONTAINER_NAME, POD_NAME};
use crate::readiness::ReadinessWatcher;
use crate::types::{PodRef, SessionOutcome, SessionRequest, SessionState, VolumeClaimRef};

/// Runs guestfs sessions against a cluster.
pub struct SessionOrchestrator {
	client: Arc<dyn K8sClient>,
	attacher: Arc<dyn AttachSession>,
	inspector: ClaimInspector,
	watcher: ReadinessWatcher,
	config: SessionConfig,
}

impl SessionOrchestrator {
	/// Create an orchestrator with the given K8s client, attacher, and configuration.
	pub fn new(
		client: Arc<dyn K8sClient>,
		attacher: Arc<dyn AttachSession>,
		config: SessionConfig,
	) -> Self {
		Self {
			inspector: ClaimInspector::new(Arc::clone(&client)),
			watcher: ReadinessWatcher::new(Arc::clone(&client), config.poll.clone()),
			client,
			attacher,
			config,
		}
	}

	/// Run one session to completion.
	///
	/// Once the pod has been created it is deleted exactly once, whatever
	/// happens afterwards, including cancellation through `cancel`.
	#[instrument(skip(self, request, cancel), fields(pvc = %request.claim.name, namespace = %request.claim.namespace))]
	pub async fn run(&self, request: &SessionRequest, cancel: &CancellationToken) -> SessionOutcome {
		let mut session = Session::new(request.claim.clone());

		session.advance(SessionState::Validating);
		if let Err(e) = self.validate(&request.claim, cancel).await {
			return session.fail(e);
		}

		session.advance(SessionState::Creating);
		let pod_ref = match self.create(request, cancel).await {
			Ok(pod_ref) => pod_ref,
			Err(CreateError::NotPersisted(e)) => return session.fail(e),
			Err(CreateError::Unknown(e)) => {
				warn!(error = %e, "Pod creation outcome unknown, cleaning up");
				session.advance(SessionState::CleaningUp);
				let cleanup_error = self.cleanup(&session_pod(&request.claim)).await.err();
				return session.finish(Some(e), cleanup_error);
			}
		};
		session.pod_created = true;

		let primary = self.drive(&mut session, request, &pod_ref, cancel).await.err();

		session.advance(SessionState::CleaningUp);
		let cleanup_error = self.cleanup(&pod_ref).await.err();
		session.finish(primary, cleanup_error)
	}

	async fn validate(
		&self,
		claim: &VolumeClaimRef,
		cancel: &CancellationToken,
	) -> Result<(), SessionError> {
		if !cancellable(cancel, self.inspector.exists(claim)).await? {
			return Err(SessionError::NotFound {
				claim: claim.name.clone(),
			});
		}
		if cancellable(cancel, self.inspector.in_use(claim)).await? {
			return Err(SessionError::Conflict {
				claim: claim.name.clone(),
			});
		}
		Ok(())
	}

	async fn create(
		&self,
		request: &SessionRequest,
		cancel: &CancellationToken,
	) -> Result<PodRef, CreateError> {
		let claim = &request.claim;
		let mode = cancellable(cancel, self.inspector.volume_mode(claim))
			.await
			.map_err(CreateError::NotPersisted)?;
		let pod = build_pod_spec(
			claim,
			&request.image,
			&request.command,
			&request.args,
			mode,
			self.config.kvm,
		);

		info!(pod_name = POD_NAME, image = %request.image, mode = ?mode, "Creating guestfs pod");
		// Not raced against `cancel`: the outcome of create must be known so a
		// persisted pod is never orphaned.
		match self.client.create_pod(&claim.namespace, pod).await {
			Ok(_) => {}
			// Includes a name collision: that pod belongs to another session.
			Err(e) if e.is_rejection() => {
				return Err(CreateError::NotPersisted(e.into()));
			}
			Err(e) => return Err(CreateError::Unknown(e.into())),
		}
		info!(path = mount_location(mode), "The PVC has been mounted at {}", mount_location(mode));

		Ok(session_pod(claim))
	}

	async fn drive(
		&self,
		session: &mut Session,
		request: &SessionRequest,
		pod: &PodRef,
		cancel: &CancellationToken,
	) -> Result<(), SessionError> {
		if cancel.is_cancelled() {
			return Err(SessionError::Cancelled);
		}

		session.advance(SessionState::WaitingReady);
		self
			.watcher
			.wait_running(pod, self.config.ready_timeout, cancel)
			.await?;

		session.advance(SessionState::Attached);
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(SessionError::Cancelled),
			result = self.attacher.attach(pod, &request.command) => result.map_err(Into::into),
		}
	}

	async fn cleanup(&self, pod: &PodRef) -> Result<(), SessionError> {
		let delete = self.client.delete_pod(
			&pod.name,
			&pod.namespace,
			self.config.delete_grace_period_secs,
		);

		let result = match tokio::time::timeout(self.config.cleanup_timeout, delete).await {
			Ok(result) => result,
			Err(_) => Err(K8sError::Timeout),
		};

		match result {
			Ok(()) => {
				info!(pod_name = %pod.name, "Deleted guestfs pod");
				Ok(())
			}
			Err(e) if e.is_not_found() => {
				debug!(pod_name = %pod.name, "Pod already deleted");
				Ok(())
			}
			Err(source) => {
				warn!(pod_name = %pod.name, error = %source, "Failed to delete guestfs pod");
				Err(SessionError::Cleanup {
					pod: pod.name.clone(),
					source,
				})
			}
		}
	}
}

fn session_pod(claim: &VolumeClaimRef) -> PodRef {
	PodRef {
		name: POD_NAME.to_string(),
		namespace: claim.namespace.clone(),
		container: CONTAINER_NAME.to_string(),
	}
}

/// Failure of the create step, split by whether a pod may have been stored.
enum CreateError {
	/// Nothing was written: the claim lookup failed or the server refused the pod.
	NotPersisted(SessionError),
	/// The create call failed without saying whether the pod was stored.
	Unknown(SessionError),
}

/// Race `fut` against cancellation of the session.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, SessionError>
where
	F: Future<Output = Result<T, SessionError>>,
{
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(SessionError::Cancelled),
		result = fut => result,
	}
}

/// Tracks the state of one run.
struct Session {
	claim: VolumeClaimRef,
	state: SessionState,
	pod_created: bool,
}

impl Session {
	fn new(claim: VolumeClaimRef) -> Self {
		Self {
			claim,
			state: SessionState::Idle,
			pod_created: false,
		}
	}

	fn advance(&mut self, next: SessionState) {
		debug_assert!(
			self.state.can_advance_to(next),
			"illegal session transition {} -> {}",
			self.state,
			next
		);
		debug!(claim = %self.claim, from = %self.state, to = %next, "Session transition");
		self.state = next;
	}

	/// End a session that never created a pod.
	fn fail(mut self, error: SessionError) -> SessionOutcome {
		warn!(claim = %self.claim, state = %self.state, error = %error, "Session failed");
		self.advance(SessionState::Failed);
		SessionOutcome {
			state: self.state,
			pod_created: self.pod_created,
			error: Some(error),
			cleanup_error: None,
		}
	}

	fn finish(
		mut self,
		error: Option<SessionError>,
		cleanup_error: Option<SessionError>,
	) -> SessionOutcome {
		match &error {
			Some(e) => {
				warn!(claim = %self.claim, error = %e, "Session failed");
				self.advance(SessionState::Failed);
			}
			None => {
				info!(claim = %self.claim, "Session finished");
				self.advance(SessionState::Terminated);
			}
		}
		SessionOutcome {
			state: self.state,
			pod_created: self.pod_created,
			error,
			cleanup_error,
		}
	}
}
