// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration layer for merging from multiple sources.

use serde::Deserialize;

/// Partial configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub session: Option<SessionLayer>,
	#[serde(default)]
	pub poll: Option<PollLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionLayer {
	#[serde(default)]
	pub namespace: Option<String>,
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub ready_timeout_secs: Option<u64>,
	#[serde(default)]
	pub kvm: Option<bool>,
	#[serde(default)]
	pub delete_grace_period_secs: Option<u32>,
	#[serde(default)]
	pub cleanup_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollLayer {
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge `other` on top of `self`; set fields in `other` win.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.session, other.session, SessionLayer::merge);
		merge_option(&mut self.poll, other.poll, PollLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn take<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl SessionLayer {
	fn merge(&mut self, other: SessionLayer) {
		take(&mut self.namespace, other.namespace);
		take(&mut self.image, other.image);
		take(&mut self.ready_timeout_secs, other.ready_timeout_secs);
		take(&mut self.kvm, other.kvm);
		take(
			&mut self.delete_grace_period_secs,
			other.delete_grace_period_secs,
		);
		take(&mut self.cleanup_timeout_secs, other.cleanup_timeout_secs);
	}
}

impl PollLayer {
	fn merge(&mut self, other: PollLayer) {
		take(&mut self.base_delay_ms, other.base_delay_ms);
		take(&mut self.max_delay_ms, other.max_delay_ms);
		take(&mut self.backoff_factor, other.backoff_factor);
		take(&mut self.jitter, other.jitter);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		take(&mut self.level, other.level);
		take(&mut self.format, other.format);
	}
}
