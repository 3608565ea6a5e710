// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request/response contracts of the backend endpoints the shell consumes:
// register-device, send-notification, and sharing-settings.
//
// Only the shapes live here. The transport (HTTP client, retries) belongs to
// whoever implements the device-registry collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WebshellError};
use crate::types::Platform;

/// Install-scoped identifier for this device. Generated once and persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `register-device` request. The backend upserts on `(device_id, platform)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_id: DeviceId,
    pub platform: Platform,
    pub push_token: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub device_name: Option<String>,
}

/// `register-device` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    /// Backend row id assigned to the device.
    pub id: String,
    /// User the device is now associated with, if any.
    pub user_id: Option<String>,
}

/// `send-notification` request. All filters are optional and combine with AND.
///
/// Backend contract only: notifications are sent server-side and the shell
/// never issues this request. The type pins the wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub device_id: Option<DeviceId>,
    pub platform: Option<Platform>,
}

/// `send-notification` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub success: bool,
    /// Number of devices the notification fanned out to.
    pub device_count: u32,
}

/// Lookup key for sharing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingSettingsKey {
    UserId(String),
    Email(String),
}

impl SharingSettingsKey {
    /// Build the key from optional query parameters, preferring the user id.
    pub fn from_query(user_id: Option<&str>, email: Option<&str>) -> Result<Self> {
        match (user_id.filter(|s| !s.is_empty()), email.filter(|s| !s.is_empty())) {
            (Some(id), _) => Ok(Self::UserId(id.to_string())),
            (None, Some(email)) => Ok(Self::Email(email.to_ascii_lowercase())),
            (None, None) => Err(WebshellError::InvalidPayload(
                "sharing settings require a user id or email".into(),
            )),
        }
    }
}

/// Per-user sharing preferences. A GET for an unknown user returns
/// `SharingSettings::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharingSettings {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub share_photos: bool,
    pub share_location: bool,
    pub share_files: bool,
    pub updated_at: Option<DateTime<Utc>>,
}
