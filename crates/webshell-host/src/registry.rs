// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend device-registry collaborator.
//
// The shell only knows the register-device contract. `HttpDeviceRegistry`
// speaks it over JSON/HTTP to the configured backend; embedders may inject
// their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use webshell_core::backend::{RegisterDeviceRequest, RegisterDeviceResponse};
use webshell_core::error::{Result, WebshellError};

/// Path of the register-device endpoint, relative to the backend base URL.
pub const REGISTER_DEVICE_PATH: &str = "register-device";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upserts this install's push registration on `(device_id, platform)`.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> Result<RegisterDeviceResponse>;
}

/// Registry used when no backend is configured. Every registration fails, so
/// the page is told `isRegistered: false`.
#[derive(Debug, Default)]
pub struct OfflineRegistry;

#[async_trait]
impl DeviceRegistry for OfflineRegistry {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> Result<RegisterDeviceResponse> {
        debug!(device_id = %request.device_id, "no backend configured; skipping registration");
        Err(WebshellError::Backend("no backend configured".into()))
    }
}

/// register-device over HTTP: `POST {base}/register-device` with the request
/// as JSON, answered with the backend row.
pub struct HttpDeviceRegistry {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpDeviceRegistry {
    /// Build a registry for the backend at `base_url` (http or https).
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| WebshellError::Backend(format!("invalid backend URL {base_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(WebshellError::Backend(format!(
                "backend URL must be http(s): {base_url}"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(REGISTER_DEVICE_PATH)
            .map_err(|e| WebshellError::Backend(format!("invalid backend URL {base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WebshellError::Backend(format!("HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeviceRegistry for HttpDeviceRegistry {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> Result<RegisterDeviceResponse> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| WebshellError::Backend(format!("register-device request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebshellError::Backend(format!(
                "register-device returned {status}: {body}"
            )));
        }

        let registered: RegisterDeviceResponse = response
            .json()
            .await
            .map_err(|e| WebshellError::Backend(format!("register-device response: {e}")))?;
        info!(
            endpoint = %self.endpoint,
            backend_id = %registered.id,
            "device registered with backend"
        );
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use webshell_core::backend::DeviceId;
    use webshell_core::types::Platform;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> RegisterDeviceRequest {
        RegisterDeviceRequest {
            device_id: DeviceId::new(),
            platform: Platform::Ios,
            push_token: "tok".into(),
            user_id: Some("u1".into()),
            user_email: None,
            device_name: None,
        }
    }

    #[tokio::test]
    async fn offline_registry_always_fails() {
        assert!(matches!(
            OfflineRegistry.register_device(&request()).await,
            Err(WebshellError::Backend(_))
        ));
    }

    #[test]
    fn endpoint_is_relative_to_base_path() {
        let registry = HttpDeviceRegistry::new("https://api.example.org/v1").expect("registry");
        assert_eq!(registry.endpoint().as_str(), "https://api.example.org/v1/register-device");
        let registry = HttpDeviceRegistry::new("https://api.example.org/").expect("registry");
        assert_eq!(registry.endpoint().as_str(), "https://api.example.org/register-device");
    }

    #[test]
    fn non_http_backend_is_rejected() {
        assert!(HttpDeviceRegistry::new("ftp://api.example.org").is_err());
        assert!(HttpDeviceRegistry::new("not a url").is_err());
    }

    #[tokio::test]
    async fn posts_request_and_parses_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/register-device"))
            .and(body_partial_json(json!({
                "platform": "ios",
                "pushToken": "tok",
                "userId": "u1",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": "dev-7", "userId": "u1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let registry = HttpDeviceRegistry::new(&format!("{}/api", server.uri())).expect("registry");
        let registered = registry.register_device(&request()).await.expect("register");
        assert_eq!(registered.id, "dev-7");
        assert_eq!(registered.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn server_error_is_a_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let registry = HttpDeviceRegistry::new(&server.uri()).expect("registry");
        match registry.register_device(&request()).await {
            Err(WebshellError::Backend(message)) => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("maintenance"), "{message}");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }
}
