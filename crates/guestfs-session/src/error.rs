// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session error types.

use guestfs_k8s::K8sError;

/// Errors that can end a guestfs session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	/// The claim does not exist
	#[error("The PVC {claim} doesn't exist")]
	NotFound { claim: String },

	/// Another pod already references the claim
	#[error("PVC {claim} is used by another pod")]
	Conflict { claim: String },

	/// The claim cannot be described as a pod volume
	#[error("PVC {claim} has an unusable volume mode: {reason}")]
	Configuration { claim: String, reason: String },

	/// Kubernetes error
	#[error(transparent)]
	Platform(#[from] K8sError),

	/// Pod did not reach Running in time
	#[error("timeout in waiting for the containers to be started in pod {pod}")]
	Timeout { pod: String },

	/// Pod reached a phase it can never leave
	#[error("Pod is not in running state but got {phase}")]
	PodNotRunning { pod: String, phase: String },

	/// Interactive session ended abnormally
	#[error(transparent)]
	Attach(#[from] AttachError),

	/// Caller cancelled the session
	#[error("session cancelled")]
	Cancelled,

	/// Pod could not be removed after the session
	#[error("failed to delete pod {pod}: {source}")]
	Cleanup {
		pod: String,
		#[source]
		source: K8sError,
	},
}

/// Failure of the interactive attach stream.
#[derive(Debug, thiserror::Error)]
#[error("attach to pod {pod} failed: {message}")]
pub struct AttachError {
	pub pod: String,
	pub message: String,
}

impl AttachError {
	pub fn new(pod: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			pod: pod.into(),
			message: message.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn claim_messages_are_stable() {
		let missing = SessionError::NotFound {
			claim: "test-pvc".into(),
		};
		assert_eq!(missing.to_string(), "The PVC test-pvc doesn't exist");

		let in_use = SessionError::Conflict {
			claim: "test-pvc".into(),
		};
		assert_eq!(in_use.to_string(), "PVC test-pvc is used by another pod");
	}

	#[test]
	fn timeout_names_the_pod() {
		let err = SessionError::Timeout {
			pod: "libguestfs-tools".into(),
		};
		assert_eq!(
			err.to_string(),
			"timeout in waiting for the containers to be started in pod libguestfs-tools"
		);
	}

	#[test]
	fn platform_errors_pass_through() {
		let err: SessionError = K8sError::PodAlreadyExists {
			name: "libguestfs-tools".into(),
		}
		.into();
		assert_eq!(err.to_string(), "Pod already exists: libguestfs-tools");
	}
}
