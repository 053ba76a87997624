// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("Pod not found: {name}")]
	PodNotFound { name: String },

	#[error("PersistentVolumeClaim not found: {name}")]
	ClaimNotFound { name: String },

	#[error("Pod already exists: {name}")]
	PodAlreadyExists { name: String },

	/// The API server refused the request; nothing was persisted.
	#[error("K8s API rejected the request ({code}): {message}")]
	Rejected { code: u16, message: String },

	#[error("Operation timed out")]
	Timeout,

	#[error("Attach error: {message}")]
	AttachError { message: String },

	#[error("K8s client configuration error: {message}")]
	ConfigError { message: String },
}

impl K8sError {
	/// Whether the server definitively refused a write, so no object exists
	/// because of it.
	pub fn is_rejection(&self) -> bool {
		matches!(
			self,
			K8sError::PodAlreadyExists { .. } | K8sError::Rejected { .. }
		)
	}

	/// Whether this error means the addressed object does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::PodNotFound { .. } | K8sError::ClaimNotFound { .. }
		)
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}

impl From<kube::config::InferConfigError> for K8sError {
	fn from(err: kube::config::InferConfigError) -> Self {
		K8sError::ConfigError {
			message: err.to_string(),
		}
	}
}
