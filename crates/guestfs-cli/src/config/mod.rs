// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration: defaults, TOML file, environment, CLI flags.

mod error;
mod layer;
mod runtime;
mod sources;

use std::path::PathBuf;

use tracing::debug;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use runtime::{GuestfsConfig, LogFormat, LogLevel, LoggingConfig};
pub use sources::{
	CliOverrides, CliSource, ConfigSource, DefaultsSource, EnvSource, FileSource, Precedence,
};

/// User config file: $XDG_CONFIG_HOME/guestfs/config.toml, or
/// ~/.config/guestfs/config.toml.
pub fn user_config_file() -> Result<PathBuf, ConfigError> {
	let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir),
		_ => dirs::home_dir()
			.ok_or(ConfigError::HomeDirNotFound)?
			.join(".config"),
	};
	Ok(config_home.join("guestfs/config.toml"))
}

/// Load configuration from every source, lowest precedence first.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<GuestfsConfig, ConfigError> {
	let file = match cli.config_file.clone() {
		Some(path) => FileSource::explicit(path),
		None => FileSource::user(user_config_file()?),
	};

	load_config_from(vec![
		Box::new(DefaultsSource),
		Box::new(file),
		Box::new(EnvSource::from_env()),
		Box::new(CliSource::new(cli)),
	])
}

/// Merge `sources` in precedence order and resolve the result.
pub fn load_config_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<GuestfsConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ConfigLayer::default();
	for source in &sources {
		debug!(source = source.name(), precedence = ?source.precedence(), "applying config source");
		merged.merge(source.load()?);
	}

	GuestfsConfig::from_layer(merged)
}
