// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error text for the page-load error view.
//
// Load failures arrive as free-form platform descriptions (for example
// "net::ERR_INTERNET_DISCONNECTED" or "The request timed out."). They are
// mapped to plain English with a suggestion and a severity that drives the
// error view presentation.

use crate::error::WebshellError;

/// How the error view should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Likely to clear up on its own; retrying may help.
    Transient,
    /// Needs the user to act first (reconnect, grant access).
    ActionRequired,
    Permanent,
}

/// Error view text for one failure.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Heading line.
    pub message: String,
    /// Body text telling the user what to try.
    pub suggestion: String,
    /// Show the Retry button.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `WebshellError` into a `HumanError`.
pub fn humanize_error(err: &WebshellError) -> HumanError {
    match err {
        WebshellError::Timeout(_) => HumanError {
            message: "The site is taking too long to load.".into(),
            suggestion: "Check your connection, then tap Retry.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        WebshellError::PermissionDenied(what) => HumanError {
            message: "The app needs your permission for this.".into(),
            suggestion: format!("Allow access to your {what} in your device settings, then try again."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        WebshellError::UserCancelled => HumanError {
            message: "Nothing was selected.".into(),
            suggestion: "Try again when you're ready.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        WebshellError::AlreadyRecording | WebshellError::NoActiveRecording => HumanError {
            message: "The recorder is busy.".into(),
            suggestion: "Stop the current recording before starting a new one.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        WebshellError::Backend(_) => HumanError {
            message: "We couldn't reach our servers.".into(),
            suggestion: "Notifications may be delayed. We'll try again next time you open the app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        WebshellError::Database(_) | WebshellError::Io(_) => HumanError {
            message: "The app's storage had a problem.".into(),
            suggestion: "Try closing and reopening the app. If this keeps happening, your device's storage may be full.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        WebshellError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Some features require a phone or tablet.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        WebshellError::NativeOperationFailed(detail) => humanize_load_failure(detail),

        WebshellError::UnknownMessageType(_)
        | WebshellError::MalformedEnvelope(_)
        | WebshellError::InvalidPayload(_)
        | WebshellError::SessionClosed
        | WebshellError::Serialization(_) => HumanError {
            message: "Something went wrong inside the app.".into(),
            suggestion: "Tap Retry to reload the page. If this keeps happening, please update the app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Map a platform page-load failure description to a `HumanError`.
pub fn humanize_load_failure(description: &str) -> HumanError {
    let lower = description.to_ascii_lowercase();

    if lower.contains("internet_disconnected")
        || lower.contains("offline")
        || lower.contains("not connected")
        || lower.contains("network_changed")
    {
        HumanError {
            message: "You're offline.".into(),
            suggestion: "Connect to Wi-Fi or mobile data, then tap Retry.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("timed out") || lower.contains("timed_out") || lower.contains("timeout") {
        HumanError {
            message: "The site is taking too long to respond.".into(),
            suggestion: "It may be busy. Wait a moment, then tap Retry.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("name_not_resolved") || lower.contains("hostname could not be found") {
        HumanError {
            message: "We couldn't find the site.".into(),
            suggestion: "Check your connection. If you're on a restricted network, try a different one.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("ssl") || lower.contains("cert") {
        HumanError {
            message: "We couldn't make a secure connection.".into(),
            suggestion: "Check that your device's date and time are correct, then tap Retry.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("connection_refused") || lower.contains("connection refused") {
        HumanError {
            message: "The site isn't accepting connections right now.".into(),
            suggestion: "It may be down for maintenance. Try again in a few minutes.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "The page couldn't be loaded.".into(),
            suggestion: format!("Tap Retry to try again. (Detail: {description})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
