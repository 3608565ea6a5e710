// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Webshell.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Webshell operations.
#[derive(Debug, Error)]
pub enum WebshellError {
    // -- Capability errors --
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("user cancelled")]
    UserCancelled,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no active recording")]
    NoActiveRecording,

    #[error("native operation failed: {0}")]
    NativeOperationFailed(String),

    // -- Bridge protocol --
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("bridge session closed")]
    SessionClosed,

    // -- Page lifecycle --
    #[error("page did not become ready within {0:?}")]
    Timeout(Duration),

    // -- Collaborators --
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WebshellError>;
