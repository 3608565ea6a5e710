// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// Permission requests are denied; every other capability returns
// `PlatformUnavailable` except device info, which describes the host.

use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{
    AlertRequest, CapturedMedia, DeviceInfo, DownloadedFile, MediaOptions, PermissionKind,
    PickedDocument, Platform, Position, RecordedAudio,
};

use crate::traits::*;

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativePermissions for StubBridge {
    fn request_permission(&self, kind: PermissionKind) -> Result<bool> {
        tracing::warn!(%kind, "NativePermissions::request_permission called on stub bridge");
        Ok(false)
    }
}

impl NativeCamera for StubBridge {
    fn capture_photo(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        tracing::warn!("NativeCamera::capture_photo called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeMediaLibrary for StubBridge {
    fn pick_image(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        tracing::warn!("NativeMediaLibrary::pick_image called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }

    fn save_to_library(&self, _uri: &str, _album_name: Option<&str>) -> Result<String> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeAudioRecorder for StubBridge {
    fn start_recording(&self) -> Result<()> {
        tracing::warn!("NativeAudioRecorder::start_recording called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }

    fn stop_recording(&self) -> Result<RecordedAudio> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeLocation for StubBridge {
    fn current_position(&self) -> Result<Position> {
        tracing::warn!("NativeLocation::current_position called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeFiles for StubBridge {
    fn download(&self, _url: &str, _file_name: &str) -> Result<DownloadedFile> {
        tracing::warn!("NativeFiles::download called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }

    fn pick_document(&self) -> Result<Option<PickedDocument>> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeShare for StubBridge {
    fn share_file(&self, _uri: &str, _mime_type: Option<&str>) -> Result<()> {
        tracing::warn!("NativeShare::share_file called on stub bridge");
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeHaptics for StubBridge {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeAlert for StubBridge {
    fn show_alert(&self, alert: &AlertRequest) -> Result<()> {
        tracing::info!(title = %alert.title, message = %alert.message, "alert (stub)");
        Ok(())
    }
}

impl NativeDevice for StubBridge {
    fn device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            platform: Platform::Desktop,
            os_version: std::env::consts::OS.to_string(),
            model: std::env::consts::ARCH.to_string(),
            device_name: None,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

impl NativePushNotifications for StubBridge {
    fn push_token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}
