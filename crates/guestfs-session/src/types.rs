// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session request and state types.

use crate::error::SessionError;

/// Identifies a persistent volume claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeClaimRef {
	pub name: String,
	pub namespace: String,
}

impl VolumeClaimRef {
	pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: namespace.into(),
		}
	}
}

impl std::fmt::Display for VolumeClaimRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// How a claim is presented inside the container, from `spec.volumeMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeMode {
	Filesystem,
	Block,
}

impl VolumeMode {
	/// Parse the K8s `volumeMode` value. Unknown values yield `None`.
	pub fn from_k8s(value: &str) -> Option<Self> {
		match value {
			"Filesystem" => Some(VolumeMode::Filesystem),
			"Block" => Some(VolumeMode::Block),
			_ => None,
		}
	}
}

/// Addresses the container a session runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
	pub name: String,
	pub namespace: String,
	pub container: String,
}

/// Everything the caller decides about one session, fixed at the process boundary.
#[derive(Debug, Clone)]
pub struct SessionRequest {
	pub claim: VolumeClaimRef,
	pub image: String,
	pub command: String,
	pub args: Vec<String>,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	Validating,
	Creating,
	WaitingReady,
	Attached,
	CleaningUp,
	Terminated,
	Failed,
}

impl SessionState {
	fn rank(self) -> u8 {
		match self {
			SessionState::Idle => 0,
			SessionState::Validating => 1,
			SessionState::Creating => 2,
			SessionState::WaitingReady => 3,
			SessionState::Attached => 4,
			SessionState::CleaningUp => 5,
			SessionState::Terminated | SessionState::Failed => 6,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, SessionState::Terminated | SessionState::Failed)
	}

	/// Whether `next` is a legal forward step from `self`.
	pub fn can_advance_to(self, next: SessionState) -> bool {
		!self.is_terminal() && next.rank() > self.rank()
	}
}

impl std::fmt::Display for SessionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			SessionState::Idle => "idle",
			SessionState::Validating => "validating",
			SessionState::Creating => "creating",
			SessionState::WaitingReady => "waiting_ready",
			SessionState::Attached => "attached",
			SessionState::CleaningUp => "cleaning_up",
			SessionState::Terminated => "terminated",
			SessionState::Failed => "failed",
		};
		f.write_str(s)
	}
}

/// Final result of a session.
///
/// `error` is the primary outcome handed back to the caller. `cleanup_error`
/// is reported next to it and never replaces it.
#[derive(Debug)]
pub struct SessionOutcome {
	pub state: SessionState,
	pub pod_created: bool,
	pub error: Option<SessionError>,
	pub cleanup_error: Option<SessionError>,
}

impl SessionOutcome {
	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}

	/// The primary result, dropping any cleanup failure.
	pub fn into_result(self) -> Result<(), SessionError> {
		match self.error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}
}
