// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in device capabilities: one handler per catalog type.
//
// Handlers only parse the payload, call the native bridge, and shape the
// result. Permission checks happen in the registry before a handler runs,
// except for RECORD_AUDIO, which gates `start` itself.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use webshell_bridge::SharedBridge;
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{
    AlertRequest, DownloadRequest, MediaOptions, MessageType, PermissionKind, PermissionsRequest,
    PermissionsResult, RecordAction, RecordAudioRequest, SaveToGalleryRequest, ShareRequest,
    VibrateRequest, permissions,
};

use crate::downloads::DownloadService;
use crate::envelope::{success_body, success_only};
use crate::gate::PermissionGate;
use crate::recorder::AudioRecorder;
use crate::registry::CapabilityRegistry;
use crate::run_native;

/// Everything the built-in handlers need. One per session.
#[derive(Clone)]
pub struct CapabilityContext {
    pub bridge: SharedBridge,
    pub gate: PermissionGate,
    pub recorder: Arc<AudioRecorder>,
    pub downloads: Arc<DownloadService>,
}

impl CapabilityContext {
    pub fn new(bridge: SharedBridge) -> Self {
        Self {
            gate: PermissionGate::new(SharedBridge::clone(&bridge)),
            recorder: Arc::new(AudioRecorder::new(SharedBridge::clone(&bridge))),
            downloads: Arc::new(DownloadService::new(SharedBridge::clone(&bridge))),
            bridge,
        }
    }
}

/// Decode a handler payload. A missing payload is treated as `{}` so types
/// with all-default fields accept it.
pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    let payload = if payload.is_null() { json!({}) } else { payload };
    serde_json::from_value(payload).map_err(|e| WebshellError::InvalidPayload(e.to_string()))
}

/// Register every device capability of the catalog.
pub fn register_device_capabilities(registry: &mut CapabilityRegistry, ctx: &CapabilityContext) {
    let gate = ctx.gate.clone();
    registry.register(MessageType::RequestPermissions, move |payload| {
        request_permissions(gate.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::TakePhoto, move |payload| {
        take_photo(bridge.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::PickImage, move |payload| {
        pick_image(bridge.clone(), payload)
    });

    let recorder = ctx.recorder.clone();
    let gate = ctx.gate.clone();
    registry.register(MessageType::RecordAudio, move |payload| {
        record_audio(recorder.clone(), gate.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::GetLocation, move |_payload| {
        get_location(bridge.clone())
    });

    let downloads = ctx.downloads.clone();
    registry.register(MessageType::DownloadFile, move |payload| {
        download_file(downloads.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::SaveToGallery, move |payload| {
        save_to_gallery(bridge.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::ShareFile, move |payload| {
        share_file(bridge.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::PickDocument, move |_payload| {
        pick_document(bridge.clone())
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::Vibrate, move |payload| {
        vibrate(bridge.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::ShowAlert, move |payload| {
        show_alert(bridge.clone(), payload)
    });

    let bridge = ctx.bridge.clone();
    registry.register(MessageType::GetDeviceInfo, move |_payload| {
        device_info(bridge.clone())
    });
}

async fn request_permissions(gate: PermissionGate, payload: Value) -> Result<Value> {
    let request: PermissionsRequest = parse_payload(payload)?;
    let granted = gate.ensure(&request.kinds()).await;
    success_body(&PermissionsResult {
        granted,
        permissions: request.permissions,
    })
}

async fn take_photo(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let options: MediaOptions = parse_payload(payload)?;
    let photo = run_native(&bridge, move |b| b.capture_photo(&options))
        .await?
        .ok_or(WebshellError::UserCancelled)?;
    success_body(&photo)
}

async fn pick_image(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let options: MediaOptions = parse_payload(payload)?;
    let image = run_native(&bridge, move |b| b.pick_image(&options))
        .await?
        .ok_or(WebshellError::UserCancelled)?;
    success_body(&image)
}

async fn record_audio(
    recorder: Arc<AudioRecorder>,
    gate: PermissionGate,
    payload: Value,
) -> Result<Value> {
    let request: RecordAudioRequest = parse_payload(payload)?;
    match request.action {
        RecordAction::Start => {
            if !gate.ensure(&permissions(&[PermissionKind::Microphone])).await {
                return Err(WebshellError::PermissionDenied(
                    PermissionKind::Microphone.to_string(),
                ));
            }
            recorder.start().await?;
            Ok(json!({ "success": true, "recording": true }))
        }
        RecordAction::Stop => {
            let audio = recorder.stop().await?;
            success_body(&audio)
        }
    }
}

async fn get_location(bridge: SharedBridge) -> Result<Value> {
    let position = run_native(&bridge, |b| b.current_position()).await?;
    success_body(&position)
}

async fn download_file(downloads: Arc<DownloadService>, payload: Value) -> Result<Value> {
    let request: DownloadRequest = parse_payload(payload)?;
    let file = downloads.download(request).await?;
    success_body(&file)
}

async fn save_to_gallery(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let request: SaveToGalleryRequest = parse_payload(payload)?;
    let uri = run_native(&bridge, move |b| {
        b.save_to_library(&request.uri, request.album_name.as_deref())
    })
    .await?;
    Ok(json!({ "success": true, "uri": uri }))
}

async fn share_file(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let request: ShareRequest = parse_payload(payload)?;
    run_native(&bridge, move |b| {
        b.share_file(&request.uri, request.mime_type.as_deref())
    })
    .await?;
    Ok(success_only())
}

async fn pick_document(bridge: SharedBridge) -> Result<Value> {
    let document = run_native(&bridge, |b| b.pick_document())
        .await?
        .ok_or(WebshellError::UserCancelled)?;
    success_body(&document)
}

async fn vibrate(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let request: VibrateRequest = parse_payload(payload)?;
    run_native(&bridge, move |b| b.vibrate(&request.pattern)).await?;
    Ok(success_only())
}

async fn show_alert(bridge: SharedBridge, payload: Value) -> Result<Value> {
    let alert: AlertRequest = parse_payload(payload)?;
    run_native(&bridge, move |b| b.show_alert(&alert)).await?;
    Ok(success_only())
}

async fn device_info(bridge: SharedBridge) -> Result<Value> {
    let info = run_native(&bridge, |b| b.device_info()).await?;
    Ok(json!({ "success": true, "deviceInfo": info }))
}
