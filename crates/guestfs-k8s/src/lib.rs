// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for guestfs volume claim sessions.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - Re-exported core/v1 types used to describe claims and pods

mod client;
mod error;
mod kube_client;
mod types;

pub use client::K8sClient;
pub use error::K8sError;
pub use kube_client::KubeClient;
pub use types::{
	AttachedProcess, Container, ContainerStatus, PersistentVolumeClaim, PersistentVolumeClaimSpec,
	PersistentVolumeClaimVolumeSource, Pod, PodSpec, PodStatus, ResourceRequirements,
	SecurityContext, TerminalSize, Volume, VolumeDevice, VolumeMount,
};
