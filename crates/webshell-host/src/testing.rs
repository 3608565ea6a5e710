// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles for the host services.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use webshell_bridge::traits::*;
use webshell_core::backend::{RegisterDeviceRequest, RegisterDeviceResponse};
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{
    AlertRequest, CapturedMedia, DeviceInfo, DownloadedFile, MediaOptions, PermissionKind,
    PickedDocument, Platform, Position, RecordedAudio,
};

use crate::registry::DeviceRegistry;

/// Backend stand-in that upserts on `(device_id, platform)` like the real
/// endpoint and remembers every request.
#[derive(Default)]
pub struct MemoryRegistry {
    rows: Mutex<HashMap<String, RegisterDeviceResponse>>,
    pub requests: Mutex<Vec<RegisterDeviceRequest>>,
}

#[async_trait]
impl DeviceRegistry for MemoryRegistry {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> Result<RegisterDeviceResponse> {
        self.requests.lock().expect("lock").push(request.clone());
        let key = format!("{}:{}", request.device_id, request.platform.as_str());
        let mut rows = self.rows.lock().expect("lock");
        let next_id = format!("row-{}", rows.len() + 1);
        let row = rows.entry(key).or_insert(RegisterDeviceResponse {
            id: next_id,
            user_id: None,
        });
        row.user_id = request.user_id.clone();
        Ok(row.clone())
    }
}

/// Phone with a push token and nothing else.
pub struct PushOnlyBridge {
    pub token: Option<String>,
}

impl PlatformBridge for PushOnlyBridge {
    fn platform_name(&self) -> &str {
        "PushOnly"
    }
}

impl NativePermissions for PushOnlyBridge {
    fn request_permission(&self, _kind: PermissionKind) -> Result<bool> {
        Ok(true)
    }
}

impl NativeCamera for PushOnlyBridge {
    fn capture_photo(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeMediaLibrary for PushOnlyBridge {
    fn pick_image(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        Err(WebshellError::PlatformUnavailable)
    }

    fn save_to_library(&self, _uri: &str, _album_name: Option<&str>) -> Result<String> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeAudioRecorder for PushOnlyBridge {
    fn start_recording(&self) -> Result<()> {
        Err(WebshellError::PlatformUnavailable)
    }

    fn stop_recording(&self) -> Result<RecordedAudio> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeLocation for PushOnlyBridge {
    fn current_position(&self) -> Result<Position> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeFiles for PushOnlyBridge {
    fn download(&self, _url: &str, _file_name: &str) -> Result<DownloadedFile> {
        Err(WebshellError::PlatformUnavailable)
    }

    fn pick_document(&self) -> Result<Option<PickedDocument>> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeShare for PushOnlyBridge {
    fn share_file(&self, _uri: &str, _mime_type: Option<&str>) -> Result<()> {
        Err(WebshellError::PlatformUnavailable)
    }
}

impl NativeHaptics for PushOnlyBridge {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        Ok(())
    }
}

impl NativeAlert for PushOnlyBridge {
    fn show_alert(&self, _alert: &AlertRequest) -> Result<()> {
        Ok(())
    }
}

impl NativeDevice for PushOnlyBridge {
    fn device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            platform: Platform::Ios,
            os_version: "18.1".into(),
            model: "iPhone16,1".into(),
            device_name: Some("Test iPhone".into()),
            app_version: "1.0.0".into(),
        })
    }
}

impl NativePushNotifications for PushOnlyBridge {
    fn push_token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}
