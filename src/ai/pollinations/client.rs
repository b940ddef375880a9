use crate::{Error, Result};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Raw response of a binary GET.
pub struct FetchedBytes {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Thin REST wrapper shared by the Pollinations text and image clients.
pub struct PollinationsHttpClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    timeout: Duration,
}

impl PollinationsHttpClient {
    #[cfg(test)]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::new_with_client(base_url, timeout, Client::new())
    }

    pub fn new_with_client(base_url: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))
    }

    pub async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Pollinations: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Pollinations API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Pollinations API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Pollinations response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Pollinations response: {}", e))
        })
    }

    pub async fn get_bytes(&self, url: Url) -> Result<FetchedBytes> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch from Pollinations: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Pollinations image error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Pollinations image error (status {}): {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedBytes {
            content_type,
            bytes,
        })
    }
}
