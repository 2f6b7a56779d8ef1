//! Client for the third-party APIs the backend talks to (Auth0, OpenAI and
//! arbitrary key-authenticated services).

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::UPSTREAM_LATENCY;
use crate::models::{ChatCompletionRequest, GenerateOptions, TokenRequest, TokenResponse};

pub const USER_AGENT: &str = "FLEARN-Backend/1.0.0";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Error)]
pub enum ExternalApiError {
    #[error("{0} credentials not configured")]
    NotConfigured(&'static str),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct ExternalApiConfig {
    pub auth0_domain: Option<String>,
    pub auth0_client_id: Option<String>,
    pub auth0_client_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub timeout: Duration,
}

impl Default for ExternalApiConfig {
    fn default() -> Self {
        Self {
            auth0_domain: None,
            auth0_client_id: None,
            auth0_client_secret: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct ExternalApi {
    client: reqwest::Client,
    config: ExternalApiConfig,
}

impl ExternalApi {
    pub fn new(config: ExternalApiConfig) -> Result<Self, ExternalApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Send `request` and decode a JSON body; any non-2xx status is an error.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ExternalApiError> {
        let _timer = UPSTREAM_LATENCY.start_timer();

        let response = request.send().await.map_err(|e| {
            tracing::error!("API request failed: {e}");
            ExternalApiError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), url = %response.url(), "API request failed");
            return Err(ExternalApiError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// List Auth0 users through the management API, fetching a
    /// client-credentials token first.
    pub async fn auth0_users(&self) -> Result<serde_json::Value, ExternalApiError> {
        let (Some(domain), Some(secret)) = (
            self.config.auth0_domain.as_deref(),
            self.config.auth0_client_secret.as_deref(),
        ) else {
            return Err(ExternalApiError::NotConfigured("Auth0"));
        };
        let base = auth0_base_url(domain);

        let token: TokenResponse = self
            .send_json(self.client.post(format!("{base}/oauth/token")).json(&TokenRequest {
                client_id: self.config.auth0_client_id.clone(),
                client_secret: secret.to_string(),
                audience: format!("{base}/api/v2/"),
                grant_type: "client_credentials",
            }))
            .await?;

        self.send_json(
            self.client
                .get(format!("{base}/api/v2/users"))
                .bearer_auth(&token.access_token),
        )
        .await
    }

    /// Single-turn chat completion against an OpenAI-compatible API.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<serde_json::Value, ExternalApiError> {
        let api_key = self
            .config
            .openai_api_key
            .as_deref()
            .ok_or(ExternalApiError::NotConfigured("OpenAI"))?;

        let url = format!(
            "{}/v1/chat/completions",
            self.config.openai_base_url.trim_end_matches('/')
        );

        self.send_json(
            self.client
                .post(url)
                .bearer_auth(api_key)
                .json(&ChatCompletionRequest::from_prompt(prompt, options)),
        )
        .await
    }

    // Some services read the bearer token, others X-API-Key, so both are sent
    pub async fn call_service(
        &self,
        endpoint: &str,
        api_key: &str,
        data: &serde_json::Value,
    ) -> Result<serde_json::Value, ExternalApiError> {
        self.send_json(
            self.client
                .post(endpoint)
                .bearer_auth(api_key)
                .header("X-API-Key", api_key)
                .json(data),
        )
        .await
    }
}

// Add https:// unless the domain already carries a scheme
fn auth0_base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(config: ExternalApiConfig) -> ExternalApi {
        ExternalApi::new(ExternalApiConfig {
            timeout: Duration::from_secs(5),
            ..config
        })
        .unwrap()
    }

    #[test]
    fn auth0_domain_gets_https_scheme() {
        assert_eq!(auth0_base_url("tenant.auth0.com"), "https://tenant.auth0.com");
        assert_eq!(auth0_base_url("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn auth0_users_exchanges_credentials_for_a_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_partial_json(json!({
                "client_id": "cid",
                "client_secret": "csecret",
                "grant_type": "client_credentials"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "mgmt-token" })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v2/users"))
            .and(header("authorization", "Bearer mgmt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user_id": "auth0|1" }])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(ExternalApiConfig {
            auth0_domain: Some(server.uri()),
            auth0_client_id: Some("cid".into()),
            auth0_client_secret: Some("csecret".into()),
            ..Default::default()
        });

        let users = api.auth0_users().await.unwrap();
        assert_eq!(users, json!([{ "user_id": "auth0|1" }]));
    }

    #[tokio::test]
    async fn auth0_without_secret_is_not_configured() {
        let api = api(ExternalApiConfig {
            auth0_domain: Some("tenant.auth0.com".into()),
            ..Default::default()
        });
        assert!(matches!(
            api.auth0_users().await,
            Err(ExternalApiError::NotConfigured("Auth0"))
        ));
    }

    #[tokio::test]
    async fn generate_text_sends_chat_completion_with_defaults() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("user-agent", USER_AGENT))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 150,
                "messages": [{ "role": "user", "content": "Explain ownership" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "..." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(ExternalApiConfig {
            openai_api_key: Some("sk-test".into()),
            openai_base_url: server.uri(),
            ..Default::default()
        });

        let completion = api
            .generate_text("Explain ownership", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(completion["choices"][0]["message"]["role"], "assistant");
    }

    #[tokio::test]
    async fn generate_text_requires_a_key() {
        let api = api(ExternalApiConfig::default());
        assert!(matches!(
            api.generate_text("hi", &GenerateOptions::default()).await,
            Err(ExternalApiError::NotConfigured("OpenAI"))
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let api = api(ExternalApiConfig {
            openai_api_key: Some("sk-revoked".into()),
            openai_base_url: server.uri(),
            ..Default::default()
        });

        let err = api
            .generate_text("hi", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalApiError::Status { status: 401, .. }));
        assert_eq!(err.to_string(), "HTTP 401: Unauthorized");
    }

    #[tokio::test]
    async fn call_service_sends_both_key_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("authorization", "Bearer svc-key"))
            .and(header("x-api-key", "svc-key"))
            .and(body_partial_json(json!({ "event": "enrolled" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(ExternalApiConfig::default());
        let reply = api
            .call_service(
                &format!("{}/hook", server.uri()),
                "svc-key",
                &json!({ "event": "enrolled" }),
            )
            .await
            .unwrap();
        assert_eq!(reply, json!({ "ok": true }));
    }
}
