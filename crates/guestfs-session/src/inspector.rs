// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Point-in-time checks on a persistent volume claim.

use std::sync::Arc;

use guestfs_k8s::{K8sClient, K8sError, Pod};
use tracing::{debug, instrument};

use crate::error::SessionError;
use crate::types::{VolumeClaimRef, VolumeMode};

/// Answers existence, volume mode, and usage questions about a claim.
///
/// Nothing here reserves the claim; every answer can be stale by the time
/// the caller acts on it.
pub struct ClaimInspector {
	client: Arc<dyn K8sClient>,
}

impl ClaimInspector {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	/// Whether the claim exists. A missing claim is `Ok(false)`, not an error.
	#[instrument(skip(self), fields(pvc = %claim.name, namespace = %claim.namespace))]
	pub async fn exists(&self, claim: &VolumeClaimRef) -> Result<bool, SessionError> {
		match self.client.get_pvc(&claim.name, &claim.namespace).await {
			Ok(_) => Ok(true),
			Err(K8sError::ClaimNotFound { .. }) => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	/// Resolve the claim's volume mode. An unset mode is a configuration error.
	#[instrument(skip(self), fields(pvc = %claim.name, namespace = %claim.namespace))]
	pub async fn volume_mode(&self, claim: &VolumeClaimRef) -> Result<VolumeMode, SessionError> {
		let pvc = match self.client.get_pvc(&claim.name, &claim.namespace).await {
			Ok(pvc) => pvc,
			Err(K8sError::ClaimNotFound { .. }) => {
				return Err(SessionError::NotFound {
					claim: claim.name.clone(),
				})
			}
			Err(e) => return Err(e.into()),
		};

		let raw = pvc
			.spec
			.as_ref()
			.and_then(|spec| spec.volume_mode.as_deref())
			.ok_or_else(|| SessionError::Configuration {
				claim: claim.name.clone(),
				reason: "volumeMode is not set".to_string(),
			})?;

		VolumeMode::from_k8s(raw).ok_or_else(|| SessionError::Configuration {
			claim: claim.name.clone(),
			reason: format!("unknown volumeMode {raw}"),
		})
	}

	/// Whether any pod in the claim's namespace lists the claim among its volumes.
	#[instrument(skip(self), fields(pvc = %claim.name, namespace = %claim.namespace))]
	pub async fn in_use(&self, claim: &VolumeClaimRef) -> Result<bool, SessionError> {
		let pods = self.client.list_pods(&claim.namespace).await?;
		let users: Vec<&str> = pods
			.iter()
			.filter(|pod| references_claim(pod, &claim.name))
			.map(|pod| pod.metadata.name.as_deref().unwrap_or_default())
			.collect();

		if !users.is_empty() {
			debug!(pods = ?users, "Claim is referenced by other pods");
		}
		Ok(!users.is_empty())
	}
}

fn references_claim(pod: &Pod, claim_name: &str) -> bool {
	pod
		.spec
		.as_ref()
		.and_then(|spec| spec.volumes.as_ref())
		.map(|volumes| {
			volumes.iter().any(|volume| {
				volume
					.persistent_volume_claim
					.as_ref()
					.is_some_and(|source| source.claim_name == claim_name)
			})
		})
		.unwrap_or(false)
}
