// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles: a scriptable platform bridge and a page channel that records
// injected scripts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use webshell_bridge::SharedBridge;
use webshell_bridge::traits::*;
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{
    AlertRequest, CapturedMedia, DeviceInfo, DownloadedFile, MediaOptions, PermissionKind,
    PickedDocument, Platform, Position, RecordedAudio,
};

use crate::envelope::Envelope;
use crate::transport::{PageChannel, parse_delivery_script};

/// Bridge whose answers are controlled by the test.
#[derive(Default)]
pub struct FakeBridge {
    pub denied: Mutex<HashSet<PermissionKind>>,
    pub cancel_pickers: AtomicBool,
    pub fail_location: AtomicBool,
    pub permission_prompts: AtomicUsize,
    pub vibrations: AtomicUsize,
    pub recordings_stopped: AtomicUsize,
    pub downloads: Mutex<Vec<(String, String)>>,
}

impl FakeBridge {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deny(&self, kind: PermissionKind) {
        self.denied.lock().expect("lock").insert(kind);
    }

    pub fn as_bridge(self: &Arc<Self>) -> SharedBridge {
        self.clone()
    }

    fn media(name: &str) -> CapturedMedia {
        CapturedMedia {
            uri: format!("file:///tmp/{name}"),
            width: 640,
            height: 480,
            file_name: name.to_string(),
            file_size: 2048,
        }
    }
}

impl PlatformBridge for FakeBridge {
    fn platform_name(&self) -> &str {
        "Fake"
    }
}

impl NativePermissions for FakeBridge {
    fn request_permission(&self, kind: PermissionKind) -> Result<bool> {
        self.permission_prompts.fetch_add(1, Ordering::SeqCst);
        Ok(!self.denied.lock().expect("lock").contains(&kind))
    }
}

impl NativeCamera for FakeBridge {
    fn capture_photo(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        if self.cancel_pickers.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Self::media("photo.jpg")))
    }
}

impl NativeMediaLibrary for FakeBridge {
    fn pick_image(&self, _options: &MediaOptions) -> Result<Option<CapturedMedia>> {
        if self.cancel_pickers.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Self::media("picked.png")))
    }

    fn save_to_library(&self, uri: &str, album_name: Option<&str>) -> Result<String> {
        Ok(format!("ph://{}/{}", album_name.unwrap_or("Camera Roll"), uri.len()))
    }
}

impl NativeAudioRecorder for FakeBridge {
    fn start_recording(&self) -> Result<()> {
        Ok(())
    }

    fn stop_recording(&self) -> Result<RecordedAudio> {
        self.recordings_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(RecordedAudio {
            uri: "file:///tmp/recording.m4a".into(),
            duration: 1500,
        })
    }
}

impl NativeLocation for FakeBridge {
    fn current_position(&self) -> Result<Position> {
        if self.fail_location.load(Ordering::SeqCst) {
            return Err(WebshellError::NativeOperationFailed("location services off".into()));
        }
        Ok(Position {
            latitude: 52.52,
            longitude: 13.405,
            accuracy: Some(5.0),
            altitude: None,
            heading: None,
            speed: None,
            timestamp: 1_700_000_000_000,
        })
    }
}

impl NativeFiles for FakeBridge {
    fn download(&self, url: &str, file_name: &str) -> Result<DownloadedFile> {
        self.downloads
            .lock()
            .expect("lock")
            .push((url.to_string(), file_name.to_string()));
        Ok(DownloadedFile {
            uri: format!("file:///docs/{file_name}"),
            file_name: file_name.to_string(),
            status: 200,
        })
    }

    fn pick_document(&self) -> Result<Option<PickedDocument>> {
        if self.cancel_pickers.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(PickedDocument {
            uri: "file:///docs/report.pdf".into(),
            name: "report.pdf".into(),
            size: 4096,
            mime_type: Some("application/pdf".into()),
        }))
    }
}

impl NativeShare for FakeBridge {
    fn share_file(&self, _uri: &str, _mime_type: Option<&str>) -> Result<()> {
        Ok(())
    }
}

impl NativeHaptics for FakeBridge {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        self.vibrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl NativeAlert for FakeBridge {
    fn show_alert(&self, _alert: &AlertRequest) -> Result<()> {
        Ok(())
    }
}

impl NativeDevice for FakeBridge {
    fn device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            platform: Platform::Android,
            os_version: "14".into(),
            model: "Pixel 8".into(),
            device_name: Some("test phone".into()),
            app_version: "1.0.0".into(),
        })
    }
}

impl NativePushNotifications for FakeBridge {
    fn push_token(&self) -> Result<Option<String>> {
        Ok(Some("fake-push-token".into()))
    }
}

/// Page channel that keeps every injected script.
#[derive(Default)]
pub struct RecordingChannel {
    scripts: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().expect("lock").clone()
    }

    /// Envelopes delivered so far, in order.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.scripts()
            .iter()
            .filter_map(|s| parse_delivery_script(s))
            .collect()
    }
}

impl PageChannel for RecordingChannel {
    fn inject_script(&self, script: &str) -> Result<()> {
        self.scripts.lock().expect("lock").push(script.to_string());
        Ok(())
    }
}
