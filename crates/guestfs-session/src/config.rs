// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session orchestrator configuration.

use std::time::Duration;

/// Default libguestfs tools image.
pub const DEFAULT_IMAGE: &str = "docker.io/afrosirh/libguestfs-tools:latest";
/// Shell started inside the container.
pub const DEFAULT_COMMAND: &str = "/bin/bash";
/// Timeout waiting for the pod to reach Running, in seconds.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 200;

/// Configuration for the session orchestrator.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	/// Timeout waiting for the pod to reach Running
	pub ready_timeout: Duration,
	/// Readiness poll backoff
	pub poll: PollConfig,
	/// Request a KVM device for the container
	pub kvm: bool,
	/// Grace period passed on pod delete; `None` keeps the pod default
	pub delete_grace_period_secs: Option<u32>,
	/// Upper bound on the cleanup delete call
	pub cleanup_timeout: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			ready_timeout: Duration::from_secs(DEFAULT_READY_TIMEOUT_SECS),
			poll: PollConfig::default(),
			kvm: true,
			delete_grace_period_secs: None,
			cleanup_timeout: Duration::from_secs(30),
		}
	}
}

/// Exponential backoff between readiness polls.
#[derive(Debug, Clone)]
pub struct PollConfig {
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_secs(2),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl PollConfig {
	/// Delay before poll number `attempt + 1`.
	pub fn delay(&self, attempt: u32) -> Duration {
		let exponent = attempt.min(i32::MAX as u32) as i32;
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}
