// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File downloads into app storage.
//
// The page supplies a URL and an optional file name. Only http(s) URLs are
// accepted, and the stored name is reduced to a single safe path component
// so a page cannot write outside the documents directory.

use chrono::Utc;
use percent_encoding::percent_decode_str;
use tracing::info;
use url::Url;

use webshell_bridge::SharedBridge;
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{DownloadRequest, DownloadedFile};

use crate::run_native;

/// Longest file name handed to the platform.
const MAX_FILE_NAME_LEN: usize = 120;

pub struct DownloadService {
    bridge: SharedBridge,
}

impl DownloadService {
    pub fn new(bridge: SharedBridge) -> Self {
        Self { bridge }
    }

    pub async fn download(&self, request: DownloadRequest) -> Result<DownloadedFile> {
        let url = validate_url(&request.url)?;
        let file_name = resolve_file_name(request.file_name.as_deref(), &url);

        let target = url.to_string();
        let file = run_native(&self.bridge, move |b| b.download(&target, &file_name)).await?;

        if !(200..300).contains(&file.status) {
            return Err(WebshellError::NativeOperationFailed(format!(
                "download of {url} failed with HTTP {}",
                file.status
            )));
        }
        info!(%url, file_name = %file.file_name, "file downloaded");
        Ok(file)
    }
}

/// Parse a page-supplied download URL. Only absolute http(s) URLs with a
/// non-empty host are accepted.
pub fn validate_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let url = Url::parse(raw)
        .map_err(|e| WebshellError::InvalidPayload(format!("invalid download URL {raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(WebshellError::InvalidPayload(format!("unsupported download URL: {raw}")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(WebshellError::InvalidPayload(format!("download URL has no host: {raw}")));
    }
    Ok(url)
}

/// Pick the stored file name: the explicit name if usable, else the decoded
/// last path segment of the URL, else a timestamped fallback.
pub fn resolve_file_name(explicit: Option<&str>, url: &Url) -> String {
    explicit
        .map(sanitize_file_name)
        .filter(|n| !n.is_empty())
        .or_else(|| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back())
                .map(|segment| sanitize_file_name(&percent_decode_str(segment).decode_utf8_lossy()))
                .filter(|n| !n.is_empty())
        })
        .unwrap_or_else(|| format!("download-{}", Utc::now().timestamp_millis()))
}

/// Reduce `name` to one safe path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    trimmed.chars().take(MAX_FILE_NAME_LEN).collect()
}
