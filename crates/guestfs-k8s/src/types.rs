// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::pin::Pin;

use futures::channel::mpsc;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

pub use k8s_openapi::api::core::v1::{
	Container, ContainerStatus, PersistentVolumeClaim, PersistentVolumeClaimSpec,
	PersistentVolumeClaimVolumeSource, Pod, PodSpec, PodStatus, ResourceRequirements,
	SecurityContext, Volume, VolumeDevice, VolumeMount,
};
pub use kube::api::TerminalSize;

use crate::error::K8sError;

/// Bidirectional stream for container I/O via the attach subresource.
pub struct AttachedProcess {
	pub stdin: Pin<Box<dyn AsyncWrite + Send>>,
	pub stdout: Pin<Box<dyn AsyncRead + Send>>,
	/// Present when the session was opened with a TTY.
	pub resize: Option<mpsc::Sender<TerminalSize>>,
	/// Resolves once the remote side has closed the session.
	pub completion: BoxFuture<'static, Result<(), K8sError>>,
}

impl std::fmt::Debug for AttachedProcess {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AttachedProcess")
			.field("resize", &self.resize.is_some())
			.finish_non_exhaustive()
	}
}
