// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::AttachError;
use crate::types::PodRef;

/// Binds the caller's terminal to a running session container.
///
/// Implementations block until the remote session ends and return `Ok(())`
/// on a clean end. The orchestrator never looks at the stream contents.
#[async_trait]
pub trait AttachSession: Send + Sync {
	async fn attach(&self, pod: &PodRef, command: &str) -> Result<(), AttachError>;
}
