// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{AttachedProcess, PersistentVolumeClaim, Pod};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the K8s operations a guestfs session needs.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Get a persistent volume claim by name.
	///
	/// Returns [`K8sError::ClaimNotFound`] when the claim does not exist.
	async fn get_pvc(&self, name: &str, namespace: &str) -> Result<PersistentVolumeClaim, K8sError>;

	/// List every pod in a namespace.
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError>;

	/// Create a new pod in the specified namespace.
	///
	/// Returns [`K8sError::PodAlreadyExists`] on a name collision.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Get a specific pod by name from the specified namespace.
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// Delete a pod by name. `None` keeps the pod's own grace period.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError>;

	/// Attach to a running container's stdin/stdout with a TTY.
	async fn exec_attach(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
	) -> Result<AttachedProcess, K8sError>;
}
