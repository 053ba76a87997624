// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interactive libguestfs sessions bound to a persistent volume claim.
//!
//! A session checks that the claim exists and is not used by another pod,
//! starts a one-shot pod that mounts (filesystem claims) or attaches (block
//! claims) the volume, waits for it to run, hands the terminal to the
//! container, and deletes the pod afterwards on every exit path.
//!
//! # Architecture
//!
//! - [`ClaimInspector`]: claim existence, volume mode, and usage
//! - [`build_pod_spec`]: the pod descriptor, a pure function
//! - [`ReadinessWatcher`]: cancellable bounded wait for the Running phase
//! - [`AttachSession`]: the interactive transport, injected by the caller
//! - [`SessionOrchestrator`]: the state machine tying them together

pub mod attach;
pub mod config;
pub mod error;
pub mod inspector;
pub mod orchestrator;
pub mod pod_spec;
pub mod readiness;
pub mod types;

pub use attach::AttachSession;
pub use config::{PollConfig, SessionConfig, DEFAULT_COMMAND, DEFAULT_IMAGE, DEFAULT_READY_TIMEOUT_SECS};
pub use error::{AttachError, SessionError};
pub use inspector::ClaimInspector;
pub use orchestrator::SessionOrchestrator;
pub use pod_spec::{build_pod_spec, mount_location, CONTAINER_NAME, POD_NAME};
pub use readiness::ReadinessWatcher;
pub use tokio_util::sync::CancellationToken;
pub use types::{
	PodRef, SessionOutcome, SessionRequest, SessionState, VolumeClaimRef, VolumeMode,
};
