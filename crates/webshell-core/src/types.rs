// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Webshell bridge: permission kinds, the message
// catalog, and the payload/result shapes exchanged with the embedded page.
//
// Wire payloads use camelCase field names because the page side is
// JavaScript.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// A device permission a capability may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    Camera,
    Microphone,
    Location,
    #[serde(alias = "media_library", alias = "storage", alias = "photos")]
    MediaLibrary,
    Notifications,
    /// Any kind this build does not recognise. Never granted.
    #[serde(other)]
    Unknown,
}

impl PermissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Location => "location",
            Self::MediaLibrary => "mediaLibrary",
            Self::Notifications => "notifications",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a page-supplied permission name, accepting the same aliases as
    /// deserialization. Unrecognised names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(name.to_string()))
            .unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of permissions a capability requires before it may run.
pub type PermissionSet = BTreeSet<PermissionKind>;

/// Build a `PermissionSet` from a slice.
pub fn permissions(kinds: &[PermissionKind]) -> PermissionSet {
    kinds.iter().copied().collect()
}

// ---------------------------------------------------------------------------
// Message catalog
// ---------------------------------------------------------------------------

/// Every message type the bridge understands.
///
/// The wire value is the SCREAMING_SNAKE_CASE string; envelopes carry it as
/// a plain string so unknown types can still be echoed back to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    RequestPermissions,
    TakePhoto,
    PickImage,
    RecordAudio,
    GetLocation,
    DownloadFile,
    SaveToGallery,
    ShareFile,
    PickDocument,
    Vibrate,
    ShowAlert,
    GetDeviceInfo,
    UpdateUserInfo,
    /// Page -> native, no response.
    UserAuth,
    /// Page -> native, no response. Explicit "content is ready" signal.
    PageReady,
    /// Native -> page, no response.
    PushToken,
    /// Native -> page, no response.
    BridgeReady,
}

impl MessageType {
    /// All catalog entries, in declaration order.
    pub const ALL: [MessageType; 17] = [
        Self::RequestPermissions,
        Self::TakePhoto,
        Self::PickImage,
        Self::RecordAudio,
        Self::GetLocation,
        Self::DownloadFile,
        Self::SaveToGallery,
        Self::ShareFile,
        Self::PickDocument,
        Self::Vibrate,
        Self::ShowAlert,
        Self::GetDeviceInfo,
        Self::UpdateUserInfo,
        Self::UserAuth,
        Self::PageReady,
        Self::PushToken,
        Self::BridgeReady,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestPermissions => "REQUEST_PERMISSIONS",
            Self::TakePhoto => "TAKE_PHOTO",
            Self::PickImage => "PICK_IMAGE",
            Self::RecordAudio => "RECORD_AUDIO",
            Self::GetLocation => "GET_LOCATION",
            Self::DownloadFile => "DOWNLOAD_FILE",
            Self::SaveToGallery => "SAVE_TO_GALLERY",
            Self::ShareFile => "SHARE_FILE",
            Self::PickDocument => "PICK_DOCUMENT",
            Self::Vibrate => "VIBRATE",
            Self::ShowAlert => "SHOW_ALERT",
            Self::GetDeviceInfo => "GET_DEVICE_INFO",
            Self::UpdateUserInfo => "UPDATE_USER_INFO",
            Self::UserAuth => "USER_AUTH",
            Self::PageReady => "PAGE_READY",
            Self::PushToken => "PUSH_TOKEN",
            Self::BridgeReady => "BRIDGE_READY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Whether the page sends this type to native (as opposed to native-only
    /// notifications).
    pub fn is_inbound(&self) -> bool {
        !matches!(self, Self::PushToken | Self::BridgeReady)
    }

    /// Permissions the native side must hold before running the handler.
    ///
    /// REQUEST_PERMISSIONS is not gated here; its handler runs the gate on
    /// the kinds named in its payload. RECORD_AUDIO checks the microphone in
    /// its handler on `start` only, so an active recording can always be
    /// stopped.
    pub fn required_permissions(&self) -> PermissionSet {
        match self {
            Self::TakePhoto => permissions(&[PermissionKind::Camera]),
            Self::PickImage | Self::SaveToGallery => permissions(&[PermissionKind::MediaLibrary]),
            Self::GetLocation => permissions(&[PermissionKind::Location]),
            _ => PermissionSet::new(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Operating system family hosting the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

impl Platform {
    /// Platform of the current compilation target.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Self::Ios
        } else if cfg!(target_os = "android") {
            Self::Android
        } else {
            Self::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Desktop => "desktop",
        }
    }
}

// ---------------------------------------------------------------------------
// Capability payloads
// ---------------------------------------------------------------------------

/// REQUEST_PERMISSIONS payload. Names are kept as sent so the response can
/// echo them unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsRequest {
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl PermissionsRequest {
    /// The requested kinds; unrecognised names become `Unknown`.
    pub fn kinds(&self) -> PermissionSet {
        self.permissions
            .iter()
            .map(|name| PermissionKind::from_name(name))
            .collect()
    }
}

/// REQUEST_PERMISSIONS result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsResult {
    pub granted: bool,
    pub permissions: Vec<String>,
}

/// Options for TAKE_PHOTO and PICK_IMAGE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaOptions {
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f64,
    pub allows_editing: bool,
    /// Optional crop aspect ratio `[width, height]`.
    pub aspect: Option<[u32; 2]>,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            quality: 0.8,
            allows_editing: false,
            aspect: None,
        }
    }
}

/// An image produced by the camera or picked from the media library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMedia {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub file_name: String,
    pub file_size: u64,
}

/// RECORD_AUDIO action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    #[default]
    Start,
    Stop,
}

/// RECORD_AUDIO payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAudioRequest {
    #[serde(default)]
    pub action: RecordAction,
}

/// A finished audio recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAudio {
    pub uri: String,
    /// Length in milliseconds.
    pub duration: u64,
}

/// A location fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// DOWNLOAD_FILE payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// A file written to app storage by a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedFile {
    pub uri: String,
    pub file_name: String,
    /// HTTP status of the transfer.
    pub status: u16,
}

/// SAVE_TO_GALLERY payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveToGalleryRequest {
    pub uri: String,
    #[serde(default)]
    pub album_name: Option<String>,
}

/// SHARE_FILE payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A document chosen through the system document picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedDocument {
    pub uri: String,
    pub name: String,
    pub size: u64,
    pub mime_type: Option<String>,
}

/// VIBRATE payload. An empty pattern means a single default pulse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VibrateRequest {
    /// Alternating wait/vibrate durations in milliseconds.
    #[serde(default)]
    pub pattern: Vec<u64>,
}

/// One button in a native alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertButton {
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
}

/// SHOW_ALERT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub buttons: Vec<AlertButton>,
}

/// Static facts about the host device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: Platform,
    pub os_version: String,
    pub model: String,
    pub device_name: Option<String>,
    pub app_version: String,
}

/// USER_AUTH / UPDATE_USER_INFO payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuth {
    pub user_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_token: Option<String>,
}

/// PUSH_TOKEN notification body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenNotice {
    pub token: Option<String>,
    pub is_registered: bool,
}
