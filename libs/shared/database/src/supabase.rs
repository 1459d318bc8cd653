use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

/// Maximum retries for idempotent reads hitting transient backend failures.
const MAX_READ_RETRIES: u32 = 2;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        // Only GETs are safe to replay; writes get a single attempt.
        let max_attempts = if method == Method::GET {
            MAX_READ_RETRIES + 1
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Making request to {} (attempt {})", url, attempt);

            let mut headers = self.get_headers(auth_token);
            if let Some(extra) = &extra_headers {
                for (name, value) in extra.iter() {
                    headers.insert(name.clone(), value.clone());
                }
            }

            let mut req = self.client.request(method.clone(), &url).headers(headers);
            if let Some(body_data) = &body {
                req = req.json(body_data);
            }

            let response = match req.send().await {
                Ok(response) => response,
                Err(e) if attempt < max_attempts => {
                    warn!("Transport error on {} (attempt {}): {}", url, attempt, e);
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                Err(e) => return Err(anyhow!("Request failed: {}", e)),
            };

            let status = response.status();
            if status.is_server_error() && attempt < max_attempts {
                warn!("Server error {} on {} (attempt {})", status, url, attempt);
                tokio::time::sleep(backoff_delay(attempt)).await;
                continue;
            }

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                error!("API error ({}): {}", status, error_text);

                return Err(match status {
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                        anyhow!("Authentication error: {}", error_text)
                    }
                    StatusCode::NOT_FOUND => anyhow!("Resource not found: {}", error_text),
                    StatusCode::CONFLICT => anyhow!("Conflict: {}", error_text),
                    _ => anyhow!("API error ({}): {}", status, error_text),
                });
            }

            let data = response.json::<T>().await?;
            return Ok(data);
        }
    }
}

fn backoff_delay(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1)))
}
