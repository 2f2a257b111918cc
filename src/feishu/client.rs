use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, multipart, Client};
use tracing::debug;

use super::types::{
    ApiResponse, FeishuConfig, SendMessageRequest, TokenRequest, TokenResponse, UploadResponse,
    MAX_IMAGE_BYTES,
};
use crate::{
    errors::{AppError, AppResult},
    notify::credential::{IssuedToken, TokenExchange},
};

/// Server TTL assumed when the token response omits `expire`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 7200;

pub struct FeishuClient {
    client: Client,
    config: FeishuConfig,
}

impl FeishuClient {
    pub fn new(client: Client, config: FeishuConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FeishuConfig {
        &self.config
    }

    /// Downloads `image_url` and uploads it, returning the image key.
    pub async fn upload_image(&self, token: &str, image_url: &str) -> AppResult<String> {
        let (bytes, content_type) = self.download_image(image_url).await?;
        let filename = format!("post_image.{}", extension_for(&content_type));

        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&content_type)?;
        let form = multipart::Form::new()
            .text("image_type", "message")
            .part("image", part);

        let response = self
            .client
            .post(self.config.endpoint("im/v1/images"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let result: UploadResponse = response.json().await?;
        if result.code != 0 {
            return Err(AppError::api(
                "feishu",
                format!(
                    "image upload failed: {}",
                    result.msg.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }

        result
            .data
            .and_then(|d| d.image_key)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::malformed("feishu", "image upload returned no image_key"))
    }

    async fn download_image(&self, image_url: &str) -> AppResult<(Vec<u8>, String)> {
        let mut response = self
            .client
            .get(image_url)
            .send()
            .await?
            .error_for_status()?;

        let header_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(declared) = response.content_length() {
            ensure_within_limit(declared)?;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            ensure_within_limit((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(AppError::malformed("image", format!("empty body from {image_url}")));
        }

        let content_type = header_type.unwrap_or_else(|| guess_content_type(image_url));
        debug!(url = %image_url, bytes = bytes.len(), content_type = %content_type, "Downloaded image");
        Ok((bytes, content_type))
    }

    /// Sends one message to one recipient.
    pub async fn send_message(
        &self,
        token: &str,
        receive_id: &str,
        msg_type: &str,
        content: &str,
    ) -> AppResult<()> {
        let request = SendMessageRequest {
            receive_id,
            msg_type,
            content,
            uuid: uuid::Uuid::new_v4().to_string(),
        };

        let response = self
            .client
            .post(self.config.endpoint("im/v1/messages"))
            .query(&[("receive_id_type", self.config.receive_id_type.as_str())])
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();

        match parsed {
            Some(result) if status.is_success() && result.code == 0 => Ok(()),
            Some(result) => Err(AppError::api(
                "feishu",
                format!(
                    "{status} code={}: {}",
                    result.code,
                    result.msg.unwrap_or_else(|| "unknown error".to_string())
                ),
            )),
            None if !status.is_success() => Err(AppError::api("feishu", format!("{status}: {text}"))),
            None => Err(AppError::malformed("feishu", text)),
        }
    }
}

/// Exchanges app credentials for a tenant access token.
pub struct FeishuTokenExchange {
    client: Client,
    config: FeishuConfig,
}

impl FeishuTokenExchange {
    pub fn new(client: Client, config: FeishuConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TokenExchange for FeishuTokenExchange {
    async fn exchange(&self) -> AppResult<IssuedToken> {
        let request = TokenRequest {
            app_id: &self.config.app_id,
            app_secret: &self.config.app_secret,
        };

        let response = self
            .client
            .post(self.config.endpoint("auth/v3/tenant_access_token/internal"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let result: TokenResponse = response.json().await?;
        if result.code != 0 {
            return Err(AppError::api(
                "feishu",
                format!(
                    "tenant_access_token: {}",
                    result.msg.unwrap_or_else(|| "unknown error".to_string())
                ),
            ));
        }

        let value = result
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::malformed("feishu", "no tenant_access_token in response"))?;

        Ok(IssuedToken {
            value,
            ttl_secs: result.expire.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        })
    }
}

/// Rejects images over the upload limit, before or while downloading.
fn ensure_within_limit(bytes: u64) -> AppResult<()> {
    if bytes > MAX_IMAGE_BYTES as u64 {
        return Err(AppError::Degraded(format!(
            "image of {bytes} bytes exceeds the 10 MiB upload limit"
        )));
    }
    Ok(())
}

fn guess_content_type(image_url: &str) -> String {
    let path = url::Url::parse(image_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| image_url.to_string());
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("jpg"),
    }
}
