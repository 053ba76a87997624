// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;

use tracing::{debug, trace};

use super::layer::{ConfigLayer, LoggingLayer, SessionLayer};
use super::ConfigError;

const ENV_PREFIX: &str = "GUESTFS_";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	File = 20,
	Environment = 30,
	Cli = 40,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		// Empty layer; defaults are applied when the merged layer is resolved.
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	required: bool,
	name: &'static str,
}

impl FileSource {
	/// User config: $XDG_CONFIG_HOME/guestfs/config.toml. Skipped when absent.
	pub fn user(path: PathBuf) -> Self {
		Self {
			path,
			required: false,
			name: "user-config",
		}
	}

	/// Config passed with `--config`. Must exist.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			required: true,
			name: "explicit-config",
		}
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		Precedence::File
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Io {
			path: self.path.clone(),
			source: e,
		})?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Recognised: GUESTFS_IMAGE, GUESTFS_NAMESPACE, GUESTFS_READY_TIMEOUT_SECS,
/// GUESTFS_KVM, GUESTFS_LOG_LEVEL, GUESTFS_LOG_FORMAT.
pub struct EnvSource {
	vars: Vec<(String, String)>,
}

impl EnvSource {
	/// Snapshot the process environment.
	pub fn from_env() -> Self {
		Self::from_vars(std::env::vars())
	}

	pub fn from_vars<I, K, V>(vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: vars
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.filter(|(k, _)| k.starts_with(ENV_PREFIX))
				.collect(),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let mut layer = ConfigLayer::default();

		for (key, value) in &self.vars {
			let value = value.trim();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key.as_str() {
				"GUESTFS_IMAGE" => session(&mut layer).image = Some(value.to_string()),
				"GUESTFS_NAMESPACE" => session(&mut layer).namespace = Some(value.to_string()),
				"GUESTFS_READY_TIMEOUT_SECS" => {
					let secs = value.parse().map_err(|_| {
						ConfigError::invalid_value(key, format!("expected seconds, got '{value}'"))
					})?;
					session(&mut layer).ready_timeout_secs = Some(secs);
				}
				"GUESTFS_KVM" => session(&mut layer).kvm = Some(parse_bool(key, value)?),
				"GUESTFS_LOG_LEVEL" => logging(&mut layer).level = Some(value.to_string()),
				"GUESTFS_LOG_FORMAT" => logging(&mut layer).format = Some(value.to_string()),
				_ => {
					// Unknown GUESTFS_ variable, ignore
				}
			}
		}

		Ok(layer)
	}
}

fn session(layer: &mut ConfigLayer) -> &mut SessionLayer {
	layer.session.get_or_insert_with(SessionLayer::default)
}

fn logging(layer: &mut ConfigLayer) -> &mut LoggingLayer {
	layer.logging.get_or_insert_with(LoggingLayer::default)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::invalid_value(
			key,
			format!("expected a boolean, got '{value}'"),
		)),
	}
}

/// Values taken from command line flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub namespace: Option<String>,
	pub image: Option<String>,
	pub ready_timeout_secs: Option<u64>,
	pub no_kvm: bool,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

/// CLI flag source, highest precedence.
pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();

		if let Some(ref namespace) = self.overrides.namespace {
			session(&mut layer).namespace = Some(namespace.clone());
		}
		if let Some(ref image) = self.overrides.image {
			session(&mut layer).image = Some(image.clone());
		}
		if let Some(secs) = self.overrides.ready_timeout_secs {
			session(&mut layer).ready_timeout_secs = Some(secs);
		}
		// Absent flag means "no opinion", not "kvm on".
		if self.overrides.no_kvm {
			session(&mut layer).kvm = Some(false);
		}
		if let Some(ref level) = self.overrides.log_level {
			logging(&mut layer).level = Some(level.clone());
		}
		if let Some(ref format) = self.overrides.log_format {
			logging(&mut layer).format = Some(format.clone());
		}

		Ok(layer)
	}
}
