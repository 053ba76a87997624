// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pod descriptor for a guestfs session.

use std::collections::BTreeMap;

use guestfs_k8s::{
	Container, PersistentVolumeClaimVolumeSource, Pod, PodSpec, ResourceRequirements,
	SecurityContext, Volume, VolumeDevice, VolumeMount,
};
use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::types::{VolumeClaimRef, VolumeMode};

/// Every session uses this pod name, so one namespace holds at most one session.
pub const POD_NAME: &str = "libguestfs-tools";
pub const CONTAINER_NAME: &str = "virt";
pub const VOLUME_NAME: &str = "volume";
/// Mount point of a filesystem claim, also the working directory.
pub const DISK_DIR: &str = "/disks";
/// Device node of a block claim.
pub const DISK_PATH: &str = "/dev/vda";
pub const KVM_DEVICE: &str = "devices.kubevirt.io/kvm";
const BACKEND_ENV: &str = "LIBGUESTFS_BACKEND";
const BACKEND_DIRECT: &str = "direct";
const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";
const RESTART_NEVER: &str = "Never";

/// Where the claim shows up inside the container.
pub fn mount_location(mode: VolumeMode) -> &'static str {
	match mode {
		VolumeMode::Block => DISK_PATH,
		VolumeMode::Filesystem => DISK_DIR,
	}
}

/// Build the pod that exposes `claim` to an interactive libguestfs shell.
///
/// Block claims are attached as a raw device at [`DISK_PATH`]; filesystem
/// claims are mounted at [`DISK_DIR`], which is also the working directory.
pub fn build_pod_spec(
	claim: &VolumeClaimRef,
	image: &str,
	command: &str,
	args: &[String],
	mode: VolumeMode,
	kvm: bool,
) -> Pod {
	let resources = if kvm {
		let mut limits = BTreeMap::new();
		limits.insert(KVM_DEVICE.to_string(), Quantity("1".to_string()));
		Some(ResourceRequirements {
			limits: Some(limits),
			..Default::default()
		})
	} else {
		None
	};

	let security_context = SecurityContext {
		run_as_user: Some(0),
		run_as_group: Some(0),
		..Default::default()
	};

	let (volume_mounts, volume_devices, working_dir) = match mode {
		VolumeMode::Block => (
			None,
			Some(vec![VolumeDevice {
				name: VOLUME_NAME.to_string(),
				device_path: DISK_PATH.to_string(),
			}]),
			None,
		),
		VolumeMode::Filesystem => (
			Some(vec![VolumeMount {
				name: VOLUME_NAME.to_string(),
				mount_path: DISK_DIR.to_string(),
				read_only: Some(false),
				..Default::default()
			}]),
			None,
			Some(DISK_DIR.to_string()),
		),
	};

	let container = Container {
		name: CONTAINER_NAME.to_string(),
		image: Some(image.to_string()),
		command: Some(vec![command.to_string()]),
		args: if args.is_empty() {
			None
		} else {
			Some(args.to_vec())
		},
		env: Some(vec![EnvVar {
			name: BACKEND_ENV.to_string(),
			value: Some(BACKEND_DIRECT.to_string()),
			value_from: None,
		}]),
		image_pull_policy: Some(PULL_IF_NOT_PRESENT.to_string()),
		security_context: Some(security_context),
		resources,
		volume_mounts,
		volume_devices,
		working_dir,
		stdin: Some(true),
		tty: Some(true),
		..Default::default()
	};

	let volume = Volume {
		name: VOLUME_NAME.to_string(),
		persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
			claim_name: claim.name.clone(),
			read_only: Some(false),
		}),
		..Default::default()
	};

	Pod {
		metadata: ObjectMeta {
			name: Some(POD_NAME.to_string()),
			namespace: Some(claim.namespace.clone()),
			..Default::default()
		},
		spec: Some(PodSpec {
			containers: vec![container],
			volumes: Some(vec![volume]),
			restart_policy: Some(RESTART_NEVER.to_string()),
			..Default::default()
		}),
		status: None,
	}
}
