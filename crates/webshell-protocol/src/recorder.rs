// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audio recording slot: Idle -> Recording -> Idle.
//
// One recording per session. The state flag is the mutual-exclusion gate:
// a second `start` is rejected, not queued. Recordings run until an explicit
// `stop`; there is no automatic time limit.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{info, warn};

use webshell_bridge::SharedBridge;
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::RecordedAudio;

use crate::run_native;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording { started_at: Instant },
}

pub struct AudioRecorder {
    bridge: SharedBridge,
    state: Mutex<RecordingState>,
}

impl AudioRecorder {
    pub fn new(bridge: SharedBridge) -> Self {
        Self {
            bridge,
            state: Mutex::new(RecordingState::Idle),
        }
    }

    pub fn state(&self) -> RecordingState {
        *self.lock()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state(), RecordingState::Recording { .. })
    }

    /// Claim the slot and start the native recorder.
    ///
    /// Fails with `AlreadyRecording` while a recording is active. If the
    /// native recorder fails to start, the slot is released again.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.lock();
            if let RecordingState::Recording { .. } = *state {
                return Err(WebshellError::AlreadyRecording);
            }
            *state = RecordingState::Recording {
                started_at: Instant::now(),
            };
        }

        match run_native(&self.bridge, |b| b.start_recording()).await {
            Ok(()) => {
                info!("audio recording started");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "native recorder failed to start");
                *self.lock() = RecordingState::Idle;
                Err(e)
            }
        }
    }

    /// Stop the active recording and return the file it produced.
    ///
    /// Fails with `NoActiveRecording` while idle. The slot is released even
    /// if the native stop fails.
    pub async fn stop(&self) -> Result<RecordedAudio> {
        let started_at = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, RecordingState::Idle) {
                RecordingState::Idle => return Err(WebshellError::NoActiveRecording),
                RecordingState::Recording { started_at } => started_at,
            }
        };

        let mut audio = run_native(&self.bridge, |b| b.stop_recording()).await?;
        if audio.duration == 0 {
            audio.duration = started_at.elapsed().as_millis() as u64;
        }
        info!(duration_ms = audio.duration, uri = %audio.uri, "audio recording stopped");
        Ok(audio)
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
