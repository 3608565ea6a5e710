// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// All methods are synchronous and may block (a permission prompt waits for
// the user). Callers on an async runtime run them through
// `tokio::task::spawn_blocking`.

use webshell_core::error::Result;
use webshell_core::types::{
    AlertRequest, CapturedMedia, DeviceInfo, DownloadedFile, MediaOptions, PermissionKind,
    PickedDocument, Position, RecordedAudio,
};

/// Unified bridge that groups all native capabilities.
pub trait PlatformBridge:
    NativePermissions
    + NativeCamera
    + NativeMediaLibrary
    + NativeAudioRecorder
    + NativeLocation
    + NativeFiles
    + NativeShare
    + NativeHaptics
    + NativeAlert
    + NativeDevice
    + NativePushNotifications
    + Send
    + Sync
{
    /// Human-readable platform name (e.g. "iOS 17", "Android 14").
    fn platform_name(&self) -> &str;
}

/// Runtime permission prompts.
pub trait NativePermissions {
    /// Request a single permission, prompting the user if needed.
    /// Returns whether it is granted.
    fn request_permission(&self, kind: PermissionKind) -> Result<bool>;
}

/// Capture images from the device camera.
pub trait NativeCamera {
    /// Launch the system camera. Returns Ok(None) if the user cancelled.
    fn capture_photo(&self, options: &MediaOptions) -> Result<Option<CapturedMedia>>;
}

/// Read from and write to the device photo library.
pub trait NativeMediaLibrary {
    /// Show the image picker. Returns Ok(None) if the user cancelled.
    fn pick_image(&self, options: &MediaOptions) -> Result<Option<CapturedMedia>>;

    /// Copy a local file into the library, optionally into a named album.
    /// Returns the URI of the new library asset.
    fn save_to_library(&self, uri: &str, album_name: Option<&str>) -> Result<String>;
}

/// Microphone recording.
pub trait NativeAudioRecorder {
    /// Begin recording to a temporary file.
    fn start_recording(&self) -> Result<()>;

    /// Finish the active recording and return the file it produced.
    fn stop_recording(&self) -> Result<RecordedAudio>;
}

/// Location services.
pub trait NativeLocation {
    /// Current position at the platform's default accuracy.
    fn current_position(&self) -> Result<Position>;
}

/// App-scoped file storage.
pub trait NativeFiles {
    /// Download `url` into the app's document directory under `file_name`.
    fn download(&self, url: &str, file_name: &str) -> Result<DownloadedFile>;

    /// Show the system document picker. Returns Ok(None) if cancelled.
    fn pick_document(&self) -> Result<Option<PickedDocument>>;
}

/// Share content via the OS share sheet.
pub trait NativeShare {
    /// Share a local file with other apps.
    fn share_file(&self, uri: &str, mime_type: Option<&str>) -> Result<()>;
}

/// Vibration motor.
pub trait NativeHaptics {
    /// Vibrate with alternating wait/vibrate durations in milliseconds.
    /// An empty pattern means one default pulse.
    fn vibrate(&self, pattern: &[u64]) -> Result<()>;
}

/// Native modal alerts.
pub trait NativeAlert {
    /// Present an alert. Returns once it is shown.
    fn show_alert(&self, alert: &AlertRequest) -> Result<()>;
}

/// Static device facts.
pub trait NativeDevice {
    fn device_info(&self) -> Result<DeviceInfo>;
}

/// Push notification registration.
pub trait NativePushNotifications {
    /// Obtain the device push token. Returns Ok(None) when the user declined
    /// notifications or the platform has no push service.
    fn push_token(&self) -> Result<Option<String>>;
}
