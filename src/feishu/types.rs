use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://open.feishu.cn/open-apis";
pub const DEFAULT_RECEIVE_ID_TYPE: &str = "chat_id";
/// Upload ceiling of the image API.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct FeishuConfig {
    pub app_id: String,
    pub app_secret: String,
    pub receive_id_type: String,
    pub receive_ids: Vec<String>,
    pub api_base_url: String,
}

impl FeishuConfig {
    pub fn new(
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        receive_ids: Vec<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            receive_id_type: DEFAULT_RECEIVE_ID_TYPE.to_string(),
            receive_ids,
            api_base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn with_receive_id_type(mut self, receive_id_type: impl Into<String>) -> Self {
        self.receive_id_type = receive_id_type.into();
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.app_id.trim().is_empty()
            && !self.app_secret.trim().is_empty()
            && !self.receive_ids.is_empty()
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub tenant_access_token: Option<String>,
    /// seconds
    #[serde(default)]
    pub expire: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
pub struct UploadData {
    #[serde(default)]
    pub image_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub receive_id: &'a str,
    pub msg_type: &'a str,
    /// JSON document serialized as a string
    pub content: &'a str,
    /// idempotency key
    pub uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
}
