//! Portal REST client
//!
//! Implements [`Publisher`] and [`PortalAdmin`] over the portal's sharing and
//! feature service REST endpoints.
//!
//! ## Endpoints
//!
//! - `{portal}/sharing/rest/generateToken` - session token
//! - `{portal}/sharing/rest/content/users/{user}/addItem` - intermediate CSV upload
//! - `{portal}/sharing/rest/content/features/analyze` - publish parameters
//! - `{portal}/sharing/rest/search` - hosted service lookup
//! - `{service}/{table}/append` - upsert into a hosted table
//!
//! Error payloads (`{"error": {"code": .., "message": ..}}`) come back with
//! HTTP 200, so every response body is checked.

use super::types::{PublishArtifact, RemoteHandle, RemoteTableHandle, ServiceHandle};
use super::{PortalAdmin, Publisher, TemplateItem};
use crate::config::PortalConfig;
use crate::tracking_core::{TrackingError, TrackingResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const INTERMEDIATE_DESCRIPTION: &str = "Intermediate table used to update table linked to EB";
const TOKEN_EXPIRATION_MINUTES: &str = "120";
const APPEND_POLL_INTERVAL: Duration = Duration::from_secs(2);
const APPEND_POLL_ATTEMPTS: u32 = 150;

#[derive(Debug, Deserialize)]
struct PortalErrorDetail {
    code: Option<i64>,
    message: Option<String>,
    #[serde(default)]
    details: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SelfResponse {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddItemResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(rename = "publishParameters")]
    publish_parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceInfo {
    #[serde(default)]
    tables: Vec<ServiceTable>,
}

#[derive(Debug, Deserialize)]
struct ServiceTable {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    #[serde(rename = "statusUrl")]
    status_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppendStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct CreateServiceResponse {
    #[serde(rename = "serviceurl")]
    service_url: String,
    #[serde(rename = "itemId")]
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct FolderResponse {
    folder: FolderInfo,
}

#[derive(Debug, Deserialize)]
struct FolderInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ItemInfo {
    title: String,
    #[serde(rename = "type")]
    item_type: String,
}

/// Map a portal error code and message onto the error taxonomy
pub fn classify_portal_error(code: Option<i64>, message: &str) -> TrackingError {
    let lower = message.to_lowercase();
    match code {
        Some(401) | Some(403) | Some(498) | Some(499) => TrackingError::RemoteAuth(message.to_string()),
        _ if lower.contains("already exists") || lower.contains("not available") => {
            TrackingError::RemoteConflict(message.to_string())
        }
        Some(404) => TrackingError::RemoteNotFound(message.to_string()),
        _ if lower.contains("not found") => TrackingError::RemoteNotFound(message.to_string()),
        _ => TrackingError::Remote(message.to_string()),
    }
}

/// Fail if a response body carries a portal error or `"success": false`
pub fn check_portal_body(body: &serde_json::Value) -> TrackingResult<()> {
    if let Some(error) = body.get("error") {
        let detail: PortalErrorDetail = serde_json::from_value(error.clone())?;
        let mut message = detail.message.unwrap_or_else(|| "Unknown portal error".to_string());
        if !detail.details.is_empty() {
            message = format!("{} ({})", message, detail.details.join("; "));
        }
        return Err(classify_portal_error(detail.code, &message));
    }
    if body.get("success").and_then(|s| s.as_bool()) == Some(false) {
        return Err(TrackingError::Remote(format!("Portal reported failure: {}", body)));
    }
    Ok(())
}

/// Feature service admin endpoint used for schema changes
pub fn admin_url(service_url: &str) -> String {
    service_url
        .trim_end_matches('/')
        .replacen("/rest/services/", "/rest/admin/services/", 1)
}

fn bool_param(value: bool) -> String {
    value.to_string()
}

pub struct PortalPublisher {
    client: reqwest::Client,
    portal_url: String,
    config: PortalConfig,
    token: Option<String>,
    username: Option<String>,
}

impl PortalPublisher {
    pub fn new(config: &PortalConfig) -> TrackingResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            portal_url: config.url.trim_end_matches('/').to_string(),
            config: config.clone(),
            token: None,
            username: None,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/sharing/rest/{}", self.portal_url, path)
    }

    fn token(&self) -> TrackingResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| TrackingError::RemoteAuth("Not signed in to the portal".to_string()))
    }

    fn user_content_url(&self) -> TrackingResult<String> {
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| TrackingError::RemoteAuth("Not signed in to the portal".to_string()))?;
        Ok(self.rest_url(&format!("content/users/{}", username)))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> TrackingResult<serde_json::Value> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_portal_error(
                Some(status.as_u16() as i64),
                &format!("HTTP {}: {}", status, text),
            ));
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        check_portal_body(&body)?;
        Ok(body)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> TrackingResult<T> {
        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("f", "json".to_string()));
        form.push(("token", self.token()?.to_string()));

        let body = self.send(self.client.post(url).form(&form)).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> TrackingResult<T> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("f", "json".to_string()));
        if let Some(token) = self.token.as_deref() {
            query.push(("token", token.to_string()));
        }

        let body = self.send(self.client.get(url).query(&query)).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn generate_token(&self, username: &str, password: &str) -> TrackingResult<String> {
        let form = [
            ("username", username.to_string()),
            ("password", password.to_string()),
            ("client", "referer".to_string()),
            ("referer", self.portal_url.clone()),
            ("expiration", TOKEN_EXPIRATION_MINUTES.to_string()),
            ("f", "json".to_string()),
        ];
        let body = self
            .send(self.client.post(self.rest_url("generateToken")).form(&form))
            .await?;
        let response: TokenResponse = serde_json::from_value(body)?;
        Ok(response.token)
    }

    async fn wait_for_append(&self, status_url: &str) -> TrackingResult<()> {
        for _ in 0..APPEND_POLL_ATTEMPTS {
            let status: AppendStatus = self.get_json(status_url, &[]).await?;
            match status.status.to_lowercase().as_str() {
                "completed" => return Ok(()),
                "failed" => {
                    return Err(TrackingError::Remote(format!(
                        "Append job failed: {}",
                        status_url
                    )))
                }
                _ => tokio::time::sleep(APPEND_POLL_INTERVAL).await,
            }
        }
        Err(TrackingError::Remote(format!(
            "Append job did not finish: {}",
            status_url
        )))
    }
}

#[async_trait]
impl Publisher for PortalPublisher {
    async fn authenticate(&mut self) -> TrackingResult<()> {
        let result: TrackingResult<(String, String)> = async {
            if let Some(token) = self.config.token.clone() {
                self.token = Some(token.clone());
                let me: SelfResponse = self.get_json(&self.rest_url("community/self"), &[]).await?;
                let username = me
                    .username
                    .or_else(|| self.config.username.clone())
                    .ok_or_else(|| TrackingError::RemoteAuth("Token is not tied to a user".to_string()))?;
                Ok((token, username))
            } else if let (Some(username), Some(password)) =
                (self.config.username.clone(), self.config.password.clone())
            {
                let token = self.generate_token(&username, &password).await?;
                Ok((token, username))
            } else {
                Err(TrackingError::RemoteAuth(
                    "Set PORTAL_TOKEN or PORTAL_USERNAME and PORTAL_PASSWORD".to_string(),
                ))
            }
        }
        .await;

        match result {
            Ok((token, username)) => {
                log::info!("🔐 Signed in to {} as {}", self.portal_url, username);
                self.token = Some(token);
                self.username = Some(username);
                Ok(())
            }
            Err(e) => {
                self.token = None;
                match e {
                    TrackingError::RemoteAuth(_) => Err(e),
                    other => Err(TrackingError::RemoteAuth(other.to_string())),
                }
            }
        }
    }

    async fn publish(&self, artifact: &PublishArtifact) -> TrackingResult<RemoteHandle> {
        let bytes = tokio::fs::read(&artifact.path).await?;
        let part = Part::bytes(bytes)
            .file_name(artifact.title.clone())
            .mime_str("text/csv")?;

        let form = Form::new()
            .text("title", artifact.title.clone())
            .text("type", "CSV")
            .text("description", INTERMEDIATE_DESCRIPTION)
            .text("f", "json")
            .text("token", self.token()?.to_string())
            .part("file", part);

        let url = format!("{}/addItem", self.user_content_url()?);
        let body = self.send(self.client.post(&url).multipart(form)).await?;
        let added: AddItemResponse = serde_json::from_value(body)?;
        log::info!("⬆️  Uploaded {} as item {}", artifact.title, added.id);

        let analyzed: AnalyzeResponse = self
            .post_form(
                &self.rest_url("content/features/analyze"),
                &[("itemid", added.id.clone()), ("filetype", "csv".to_string())],
            )
            .await?;

        Ok(RemoteHandle {
            item_id: added.id,
            kind: artifact.kind,
            title: artifact.title.clone(),
            source_info: analyzed.publish_parameters,
        })
    }

    async fn discover_service(&self, name: &str) -> TrackingResult<Vec<RemoteTableHandle>> {
        let search: SearchResponse = self
            .get_json(
                &self.rest_url("search"),
                &[
                    ("q", format!("title:\"{}\" AND type:\"Feature Service\"", name)),
                    ("num", "25".to_string()),
                ],
            )
            .await?;

        let service_url = search
            .results
            .into_iter()
            .find(|r| r.title == name)
            .and_then(|r| r.url)
            .ok_or_else(|| TrackingError::RemoteNotFound(name.to_string()))?;

        let info: ServiceInfo = self.get_json(&service_url, &[]).await?;
        if info.tables.is_empty() {
            return Err(TrackingError::RemoteNotFound(format!("{} has no tables", name)));
        }

        log::info!("🔎 Found {} with {} tables", name, info.tables.len());
        Ok(info
            .tables
            .into_iter()
            .map(|t| RemoteTableHandle {
                service_url: service_url.clone(),
                layer_id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn append_upsert(
        &self,
        table: &RemoteTableHandle,
        artifact: &PublishArtifact,
        handle: &RemoteHandle,
        key_column: &str,
    ) -> TrackingResult<()> {
        let params = [
            ("sourceTableName", artifact.title.clone()),
            ("appendItemId", handle.item_id.clone()),
            ("appendUploadFormat", "csv".to_string()),
            ("appendSourceInfo", handle.source_info.to_string()),
            ("appendFields", serde_json::to_string(artifact.columns())?),
            ("upsert", bool_param(true)),
            ("skipInserts", bool_param(false)),
            ("skipUpdates", bool_param(false)),
            ("updateGeometry", bool_param(false)),
            ("useGlobalIds", bool_param(false)),
            ("upsertMatchingField", key_column.to_string()),
            ("rollbackOnFailure", bool_param(true)),
            ("async", bool_param(true)),
        ];

        let url = format!("{}/append", table.url());
        let response: AppendResponse = self.post_form(&url, &params).await?;
        if let Some(status_url) = response.status_url {
            self.wait_for_append(&status_url).await?;
        }

        log::info!("🔁 Upserted {} into {} on {}", artifact.title, table.name, key_column);
        Ok(())
    }

    async fn cleanup(&self, handle: &RemoteHandle) -> TrackingResult<()> {
        let url = format!("{}/items/{}/delete", self.user_content_url()?, handle.item_id);
        let _: serde_json::Value = self.post_form(&url, &[]).await?;
        log::info!("🗑️  Deleted intermediate item {}", handle.item_id);
        Ok(())
    }
}

#[async_trait]
impl PortalAdmin for PortalPublisher {
    async fn create_service(
        &self,
        name: &str,
        create_params: &serde_json::Value,
    ) -> TrackingResult<ServiceHandle> {
        let url = format!("{}/createService", self.user_content_url()?);
        let response: CreateServiceResponse = self
            .post_form(
                &url,
                &[
                    ("createParameters", create_params.to_string()),
                    ("outputType", "featureService".to_string()),
                ],
            )
            .await?;

        log::info!("🆕 Created service {} ({})", name, response.item_id);
        Ok(ServiceHandle {
            item_id: response.item_id,
            url: response.service_url,
        })
    }

    async fn add_to_definition(
        &self,
        service: &ServiceHandle,
        definition: &serde_json::Value,
    ) -> TrackingResult<()> {
        let url = format!("{}/addToDefinition", admin_url(&service.url));
        let _: serde_json::Value = self
            .post_form(&url, &[("addToDefinition", definition.to_string())])
            .await?;
        Ok(())
    }

    async fn create_folder(&self, title: &str) -> TrackingResult<String> {
        let url = format!("{}/createFolder", self.user_content_url()?);
        let response: FolderResponse = self.post_form(&url, &[("title", title.to_string())]).await?;
        log::info!("📁 Created folder {} ({})", title, response.folder.id);
        Ok(response.folder.id)
    }

    async fn move_item(&self, item_id: &str, folder_id: &str) -> TrackingResult<()> {
        let url = format!("{}/items/{}/move", self.user_content_url()?, item_id);
        let _: serde_json::Value = self.post_form(&url, &[("folder", folder_id.to_string())]).await?;
        Ok(())
    }

    async fn fetch_template(&self, portal_url: &str, item_id: &str) -> TrackingResult<TemplateItem> {
        let base = format!(
            "{}/sharing/rest/content/items/{}",
            portal_url.trim_end_matches('/'),
            item_id
        );
        let info: ItemInfo = self.get_json(&base, &[]).await?;
        let data: serde_json::Value = self.get_json(&format!("{}/data", base), &[]).await?;

        Ok(TemplateItem {
            title: info.title,
            item_type: info.item_type,
            data: data.to_string(),
        })
    }

    async fn add_item(&self, folder_id: &str, item: &TemplateItem) -> TrackingResult<String> {
        let url = format!("{}/{}/addItem", self.user_content_url()?, folder_id);
        let added: AddItemResponse = self
            .post_form(
                &url,
                &[
                    ("title", item.title.clone()),
                    ("type", item.item_type.clone()),
                    ("text", item.data.clone()),
                ],
            )
            .await?;
        Ok(added.id)
    }

    async fn update_title(&self, item_id: &str, title: &str) -> TrackingResult<()> {
        let url = format!("{}/items/{}/update", self.user_content_url()?, item_id);
        let _: serde_json::Value = self.post_form(&url, &[("title", title.to_string())]).await?;
        Ok(())
    }
}
