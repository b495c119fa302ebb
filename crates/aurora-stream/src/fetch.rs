//! Non-streaming JSON calls through the proxy.

use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::agents::PROXY_PREFIX;
use crate::error::{StreamError, StreamResult, error_message_from_body, reason_phrase};

/// Thin JSON client for `/api/aurora/*` paths.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for a server at `base_url` (e.g. "http://localhost:3000").
    pub fn new(base_url: impl Into<String>) -> StreamResult<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing client so cookies are shared with chat streams.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full URL for a backend path, e.g. `/v1/agents`.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}{}/{}", self.base_url, PROXY_PREFIX, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> StreamResult<T> {
        self.request_json::<(), T>(Method::GET, path, None).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> StreamResult<T> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    async fn request_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> StreamResult<T> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let reason = reason_phrase(&response);
            let text = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status,
                message: error_message_from_body(status, reason.as_deref(), &text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| StreamError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_prefix_and_path() {
        let api = ApiClient::with_client(Client::new(), "http://localhost:3000/");
        assert_eq!(
            api.url("/v1/agents"),
            "http://localhost:3000/api/aurora/v1/agents"
        );
        assert_eq!(api.url("health"), "http://localhost:3000/api/aurora/health");
    }
}
