// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Engine-wide error classification. The variant decides how a failure
/// propagates: transport-level `Io`/`Http` failures are retryable within
/// the task deadline, everything else is terminal for the affected
/// message (see the per-task terminal handlers).
#[derive(Debug, Error)]
pub enum MmsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode PDU: {0}")]
    Decode(String),

    #[error("failed to encode PDU: {0}")]
    Encode(String),

    #[error("invalid argument: {0}")]
    Args(String),

    #[error("message already expired")]
    Expired,

    #[error("network unavailable")]
    NetworkUnavailable,
}

impl MmsError {
    pub fn decode(msg: impl Into<String>) -> Self {
        MmsError::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        MmsError::Encode(msg.into())
    }

    pub fn args(msg: impl Into<String>) -> Self {
        MmsError::Args(msg.into())
    }

    /// Transport-level failures are worth retrying before the deadline,
    /// semantic failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            MmsError::Io(_) => true,
            MmsError::Http(e) => !e.is_status(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MmsError>;
