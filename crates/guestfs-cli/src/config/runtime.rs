// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolved runtime configuration.

use std::time::Duration;

use guestfs_session::{PollConfig, SessionConfig, DEFAULT_IMAGE};

use super::layer::{ConfigLayer, LoggingLayer, PollLayer, SessionLayer};
use super::ConfigError;

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct GuestfsConfig {
	/// Claim namespace; `None` falls back to the kubeconfig context default.
	pub namespace: Option<String>,
	pub image: String,
	pub session: SessionConfig,
	pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Compact,
	Pretty,
	Json,
}

impl GuestfsConfig {
	/// Apply defaults to a merged layer and validate the result.
	pub fn from_layer(layer: ConfigLayer) -> Result<Self, ConfigError> {
		let session_layer = layer.session.unwrap_or_default();
		let mut session = resolve_session(&session_layer)?;
		session.poll = resolve_poll(layer.poll.unwrap_or_default())?;

		Ok(Self {
			namespace: session_layer.namespace.filter(|ns| !ns.is_empty()),
			image: session_layer
				.image
				.unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
			session,
			logging: resolve_logging(layer.logging.unwrap_or_default())?,
		})
	}
}

fn resolve_session(layer: &SessionLayer) -> Result<SessionConfig, ConfigError> {
	let defaults = SessionConfig::default();

	let ready_timeout = match layer.ready_timeout_secs {
		Some(0) => {
			return Err(ConfigError::invalid_value(
				"ready_timeout_secs",
				"must be greater than zero",
			))
		}
		Some(secs) => Duration::from_secs(secs),
		None => defaults.ready_timeout,
	};

	let cleanup_timeout = match layer.cleanup_timeout_secs {
		Some(0) => {
			return Err(ConfigError::invalid_value(
				"cleanup_timeout_secs",
				"must be greater than zero",
			))
		}
		Some(secs) => Duration::from_secs(secs),
		None => defaults.cleanup_timeout,
	};

	Ok(SessionConfig {
		ready_timeout,
		kvm: layer.kvm.unwrap_or(defaults.kvm),
		delete_grace_period_secs: layer
			.delete_grace_period_secs
			.or(defaults.delete_grace_period_secs),
		cleanup_timeout,
		poll: defaults.poll,
	})
}

fn resolve_poll(layer: PollLayer) -> Result<PollConfig, ConfigError> {
	let defaults = PollConfig::default();
	let poll = PollConfig {
		base_delay: layer
			.base_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.base_delay),
		max_delay: layer
			.max_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.max_delay),
		backoff_factor: layer.backoff_factor.unwrap_or(defaults.backoff_factor),
		jitter: layer.jitter.unwrap_or(defaults.jitter),
	};

	if poll.base_delay.is_zero() {
		return Err(ConfigError::invalid_value(
			"poll.base_delay_ms",
			"must be greater than zero",
		));
	}
	if poll.max_delay < poll.base_delay {
		return Err(ConfigError::invalid_value(
			"poll.max_delay_ms",
			"must not be less than poll.base_delay_ms",
		));
	}
	if !poll.backoff_factor.is_finite() || poll.backoff_factor < 1.0 {
		return Err(ConfigError::invalid_value(
			"poll.backoff_factor",
			"must be a finite number >= 1.0",
		));
	}
	Ok(poll)
}

fn resolve_logging(layer: LoggingLayer) -> Result<LoggingConfig, ConfigError> {
	let level = match layer.level.as_deref().map(str::to_ascii_lowercase).as_deref() {
		None => LogLevel::default(),
		Some("error") => LogLevel::Error,
		Some("warn") => LogLevel::Warn,
		Some("info") => LogLevel::Info,
		Some("debug") => LogLevel::Debug,
		Some("trace") => LogLevel::Trace,
		Some(other) => {
			return Err(ConfigError::invalid_value(
				"logging.level",
				format!("unknown level '{other}'"),
			))
		}
	};

	let format = match layer.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
		None => LogFormat::default(),
		Some("compact") => LogFormat::Compact,
		Some("pretty") => LogFormat::Pretty,
		Some("json") => LogFormat::Json,
		Some(other) => {
			return Err(ConfigError::invalid_value(
				"logging.format",
				format!("unknown format '{other}'"),
			))
		}
	};

	Ok(LoggingConfig { level, format })
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_empty_layer_resolves_to_defaults() {
		let config = GuestfsConfig::from_layer(ConfigLayer::default()).unwrap();
		assert_eq!(config.namespace, None);
		assert_eq!(config.image, "docker.io/afrosirh/libguestfs-tools:latest");
		assert_eq!(config.session.ready_timeout, Duration::from_secs(200));
		assert!(config.session.kvm);
		assert_eq!(config.session.delete_grace_period_secs, None);
		assert_eq!(config.logging.level, LogLevel::Info);
		assert_eq!(config.logging.format, LogFormat::Compact);
	}

	#[test]
	fn test_layer_values_are_applied() {
		let layer: ConfigLayer = toml::from_str(
			r#"
			[session]
			namespace = "vms"
			image = "quay.io/guestfs/tools:2"
			ready_timeout_secs = 30
			kvm = false
			delete_grace_period_secs = 0

			[poll]
			base_delay_ms = 50
			max_delay_ms = 500

			[logging]
			level = "DEBUG"
			format = "json"
			"#,
		)
		.unwrap();

		let config = GuestfsConfig::from_layer(layer).unwrap();
		assert_eq!(config.namespace.as_deref(), Some("vms"));
		assert_eq!(config.image, "quay.io/guestfs/tools:2");
		assert_eq!(config.session.ready_timeout, Duration::from_secs(30));
		assert!(!config.session.kvm);
		assert_eq!(config.session.delete_grace_period_secs, Some(0));
		assert_eq!(config.session.poll.base_delay, Duration::from_millis(50));
		assert_eq!(config.session.poll.max_delay, Duration::from_millis(500));
		assert_eq!(config.logging.level, LogLevel::Debug);
		assert_eq!(config.logging.format, LogFormat::Json);
	}

	#[test]
	fn test_empty_namespace_falls_back() {
		let layer = ConfigLayer {
			session: Some(SessionLayer {
				namespace: Some(String::new()),
				..Default::default()
			}),
			..Default::default()
		};
		assert_eq!(GuestfsConfig::from_layer(layer).unwrap().namespace, None);
	}

	#[test]
	fn test_zero_ready_timeout_is_rejected() {
		let layer = ConfigLayer {
			session: Some(SessionLayer {
				ready_timeout_secs: Some(0),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(
			GuestfsConfig::from_layer(layer),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_unknown_log_level_is_rejected() {
		let layer = ConfigLayer {
			logging: Some(LoggingLayer {
				level: Some("loud".to_string()),
				format: None,
			}),
			..Default::default()
		};
		let err = GuestfsConfig::from_layer(layer).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Invalid value for logging.level: unknown level 'loud'"
		);
	}

	#[test]
	fn test_inverted_poll_bounds_are_rejected() {
		let layer = ConfigLayer {
			poll: Some(PollLayer {
				base_delay_ms: Some(1000),
				max_delay_ms: Some(10),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(GuestfsConfig::from_layer(layer).is_err());
	}

	proptest! {
		#[test]
		fn prop_valid_poll_layers_resolve(
			base in 1u64..10_000,
			extra in 0u64..10_000,
			factor in 1.0f64..8.0,
		) {
			let poll = resolve_poll(PollLayer {
				base_delay_ms: Some(base),
				max_delay_ms: Some(base + extra),
				backoff_factor: Some(factor),
				jitter: Some(false),
			})
			.unwrap();
			prop_assert!(poll.base_delay <= poll.max_delay);
			prop_assert!(poll.delay(64) <= poll.max_delay + Duration::from_micros(1));
		}
	}
}
