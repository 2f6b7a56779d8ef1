use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// Body of POST /api/protected/ai/generate
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub options: GenerateOptions,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct GenerateOptions {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "maxTokens")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

// OpenAI chat completions request format
#[derive(Serialize, Clone, Debug)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatCompletionRequest {
    pub fn from_prompt(prompt: &str, options: &GenerateOptions) -> Self {
        Self {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}

// Auth0 client-credentials grant
#[derive(Serialize, Clone, Debug)]
pub struct TokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub client_secret: String,
    pub audience: String,
    pub grant_type: &'static str,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
}

// Body of POST /api/protected/services/{name}
// The downstream credential is `service_key`; `api_key` stays reserved for the caller's own key
#[derive(Deserialize, Clone, Debug)]
pub struct ServiceCallRequest {
    pub endpoint: String,
    pub service_key: String,
    #[serde(default)]
    pub data: serde_json::Value,
}
