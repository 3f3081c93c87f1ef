//! reqwest client for the reminders server

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::{ListApi, NotificationRegistrar, ReminderApi};
use crate::error::{Error, Result};
use crate::models::{List, ListId, ListPatch, NewList, NewReminder, Reminder, ReminderId, ReminderPatch};
use crate::sync::{SyncRequest, SyncResponse, SyncTransport};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// HTTP client for the sync and mutation endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    session_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        session_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            session_token: normalize_text_option(session_token),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header("Accept", "application/json");
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = send(builder).await?;
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<()> {
        send(builder).await?;
        Ok(())
    }

    /// `POST /api/user/onesignal`
    pub async fn register_device(&self, player_id: &str) -> Result<()> {
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(Error::InvalidInput("player id must not be empty".to_string()));
        }
        Self::send_empty(
            self.request(Method::POST, "/api/user/onesignal")
                .json(&DeviceRegistration { player_id }),
        )
        .await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceRegistration<'a> {
    player_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn send(builder: RequestBuilder) -> Result<Response> {
    let response = builder.send().await.map_err(map_transport_error)?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }
    Ok(response)
}

fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(error)
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return compact_text(&message);
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), ToString::to_string)
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("API base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl SyncTransport for ApiClient {
    async fn pull(&self, request: &SyncRequest) -> Result<SyncResponse> {
        Self::send_json(
            self.request(Method::GET, "/api/sync")
                .query(&request.query_pairs()),
        )
        .await
    }
}

#[async_trait]
impl ReminderApi for ApiClient {
    async fn create_reminder(&self, input: &NewReminder) -> Result<Reminder> {
        let path = format!("/api/lists/{}/reminders", segment(input.list_id.as_str()));
        Self::send_json(self.request(Method::POST, &path).json(input)).await
    }

    async fn update_reminder(&self, id: &ReminderId, patch: &ReminderPatch) -> Result<Reminder> {
        let path = format!("/api/reminders/{}", segment(id.as_str()));
        Self::send_json(self.request(Method::PATCH, &path).json(patch)).await
    }

    async fn delete_reminder(&self, id: &ReminderId) -> Result<()> {
        let path = format!("/api/reminders/{}", segment(id.as_str()));
        Self::send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn restore_reminder(&self, id: &ReminderId) -> Result<Reminder> {
        let path = format!("/api/reminders/{}/restore", segment(id.as_str()));
        Self::send_json(self.request(Method::PATCH, &path)).await
    }
}

#[async_trait]
impl ListApi for ApiClient {
    async fn create_list(&self, input: &NewList) -> Result<List> {
        Self::send_json(self.request(Method::POST, "/api/lists").json(input)).await
    }

    async fn update_list(&self, id: &ListId, patch: &ListPatch) -> Result<List> {
        let path = format!("/api/lists/{}", segment(id.as_str()));
        Self::send_json(self.request(Method::PATCH, &path).json(patch)).await
    }
}

/// Registers this device's push id with the server once per process.
pub struct DeviceRegistrar {
    client: ApiClient,
    player_id: Option<String>,
    registered: OnceCell<()>,
}

impl DeviceRegistrar {
    pub fn new(client: ApiClient, player_id: Option<String>) -> Self {
        Self {
            client,
            player_id: normalize_text_option(player_id),
            registered: OnceCell::new(),
        }
    }
}

#[async_trait]
impl NotificationRegistrar for DeviceRegistrar {
    async fn ensure_registered(&self) -> Result<()> {
        let Some(player_id) = self.player_id.as_deref() else {
            return Err(Error::InvalidInput(
                "no push device id configured".to_string(),
            ));
        };
        self.registered
            .get_or_try_init(|| async {
                self.client.register_device(player_id).await?;
                tracing::info!("Registered device for reminder notifications");
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://nudge.example.com/ ".to_string()).unwrap(),
            "https://nudge.example.com"
        );
    }

    #[test]
    fn parse_api_error_prefers_error_field() {
        assert_eq!(
            parse_api_error(StatusCode::FORBIDDEN, r#"{"error":"Sem permissão"}"#),
            "Sem permissão"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"message":"bad title"}"#),
            "bad title"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, " upstream down "), "upstream down");
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(segment("abc123"), "abc123");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn debug_redacts_session_token() {
        let client = ApiClient::new(
            "https://nudge.example.com",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn registrar_without_player_id_fails_fast() {
        let client =
            ApiClient::new("http://127.0.0.1:9", None, Duration::from_millis(100)).unwrap();
        let registrar = DeviceRegistrar::new(client, Some("  ".to_string()));
        assert!(matches!(
            registrar.ensure_registered().await,
            Err(Error::InvalidInput(_))
        ));
    }
}
