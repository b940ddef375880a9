use super::client::PollinationsHttpClient;
use crate::ai::mime::resolve_image_mime;
use crate::ai::ImageGenerationService;
use crate::models::{Illustration, ImageRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub struct PollinationsImageClient {
    http: PollinationsHttpClient,
}

impl PollinationsImageClient {
    #[cfg(test)]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self::new_with_client(base_url, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(base_url: String, timeout: Duration, client: reqwest::Client) -> Self {
        Self {
            http: PollinationsHttpClient::new_with_client(base_url, timeout, client),
        }
    }

    fn build_url(&self, request: &ImageRequest) -> Result<Url> {
        let mut url = self.http.url("/prompt")?;

        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base", self.http.base_url)))?
            .pop_if_empty()
            .push(&request.prompt);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("seed", &request.seed.to_string());
            if let Some(width) = request.width {
                query.append_pair("width", &width.to_string());
            }
            query.append_pair("height", &request.height.to_string());
            if let Some(model) = &request.model {
                query.append_pair("model", model);
            }
            query.append_pair("nologo", "true");
        }

        Ok(url)
    }
}

#[async_trait]
impl ImageGenerationService for PollinationsImageClient {
    fn image_url(&self, request: &ImageRequest) -> Result<String> {
        Ok(self.build_url(request)?.to_string())
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Illustration> {
        let url = self.build_url(request)?;
        tracing::debug!("Requesting illustration: {}", url);

        let fetched = self.http.get_bytes(url.clone()).await?;
        if fetched.bytes.is_empty() {
            return Err(Error::AiProvider(format!(
                "Empty image body for prompt '{}'",
                request.prompt
            )));
        }

        let mime = resolve_image_mime(fetched.content_type.as_deref(), &fetched.bytes);

        Ok(Illustration {
            url: url.to_string(),
            mime,
            bytes: fetched.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(prompt: &str) -> ImageRequest {
        ImageRequest {
            prompt: prompt.to_string(),
            seed: 1337,
            width: None,
            height: 350,
            model: None,
        }
    }

    #[test]
    fn test_image_url_encodes_prompt_and_seed() {
        let client = PollinationsImageClient::new(
            "https://image.pollinations.ai".to_string(),
            Duration::from_secs(5),
        );

        let url = client.image_url(&request("A cat woke up")).unwrap();
        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/A%20cat%20woke%20up?seed=1337&height=350&nologo=true"
        );
    }

    #[test]
    fn test_image_url_escapes_slashes_in_prompt() {
        let client = PollinationsImageClient::new(
            "https://image.pollinations.ai/".to_string(),
            Duration::from_secs(5),
        );

        let url = client.image_url(&request("cats/dogs?")).unwrap();
        assert!(url.starts_with("https://image.pollinations.ai/prompt/cats%2Fdogs%3F?"));
    }

    #[test]
    fn test_image_url_is_deterministic() {
        let client = PollinationsImageClient::new(
            "https://image.pollinations.ai".to_string(),
            Duration::from_secs(5),
        );

        let mut with_options = request("Max the dog");
        with_options.width = Some(512);
        with_options.model = Some("flux".to_string());

        let first = client.image_url(&with_options).unwrap();
        let second = client.image_url(&with_options).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("width=512"));
        assert!(first.contains("model=flux"));
    }

    #[tokio::test]
    async fn test_generate_image_fetches_bytes() {
        let server = MockServer::start().await;
        let fake_image = vec![0x89, 0x50, 0x4E, 0x47];

        Mock::given(method("GET"))
            .and(path("/prompt/A%20cat"))
            .and(query_param("seed", "1337"))
            .and(query_param("height", "350"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(fake_image.clone()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = PollinationsImageClient::new(server.uri(), Duration::from_secs(5));
        let illustration = client.generate_image(&request("A cat")).await.unwrap();

        assert_eq!(illustration.bytes, fake_image);
        assert_eq!(illustration.mime, "image/png");
        assert!(illustration.url.contains("seed=1337"));
    }

    #[tokio::test]
    async fn test_generate_image_sniffs_mime_without_content_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .mount(&server)
            .await;

        let client = PollinationsImageClient::new(server.uri(), Duration::from_secs(5));
        let illustration = client.generate_image(&request("A dog")).await.unwrap();

        assert_eq!(illustration.mime, "image/jpeg");
    }

    #[tokio::test]
    async fn test_generate_image_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let client = PollinationsImageClient::new(server.uri(), Duration::from_secs(5));
        let err = client.generate_image(&request("A dog")).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_generate_image_rejects_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = PollinationsImageClient::new(server.uri(), Duration::from_secs(5));
        let err = client.generate_image(&request("A dog")).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
