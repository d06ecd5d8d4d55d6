use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use convo_core::error::CatalogueError;
use convo_core::repositories::ModelCatalogue;

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

/// Model catalogue backed by an Ollama server.
#[derive(Clone)]
pub struct OllamaCatalogue {
    client: Client,
    base_url: String,
}

impl OllamaCatalogue {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogueError> {
        Url::parse(base_url)
            .map_err(|e| CatalogueError::Unreachable(format!("invalid base url {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogueError::Unreachable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ModelCatalogue for OllamaCatalogue {
    async fn models(&self) -> Result<Vec<String>, CatalogueError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to call Ollama API: {}", e);
                CatalogueError::Unreachable(format!("unable to list models: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Ollama API error: {} - {}", status, body);
            return Err(CatalogueError::InvalidResponse(format!(
                "unable to list models: {} - {}",
                status, body
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| CatalogueError::InvalidResponse(format!("failed to parse model list: {}", e)))?;

        let mut models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        models.sort();
        debug!("Ollama lists {} models", models.len());
        Ok(models)
    }

    async fn heartbeat(&self) -> Result<(), CatalogueError> {
        let response = self
            .client
            .head(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| CatalogueError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogueError::Unreachable(format!(
                "heartbeat returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalogue(server: &MockServer) -> OllamaCatalogue {
        OllamaCatalogue::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_models_are_sorted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [
                    { "name": "qwen2.5:7b", "size": 4683087332u64 },
                    { "name": "llama3.2:latest", "size": 2019393189u64 },
                    { "name": "mistral:latest", "size": 4113301824u64 }
                ]
            })))
            .mount(&server)
            .await;

        let models = catalogue(&server).models().await.unwrap();
        assert_eq!(models, vec!["llama3.2:latest", "mistral:latest", "qwen2.5:7b"]);
    }

    #[tokio::test]
    async fn test_models_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = catalogue(&server).models().await.unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_models_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = catalogue(&server).models().await.unwrap_err();
        assert!(matches!(err, CatalogueError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(catalogue(&server).heartbeat().await.is_ok());
    }

    #[tokio::test]
    async fn test_heartbeat_failure() {
        // no mock mounted: wiremock answers 404
        let server = MockServer::start().await;
        let err = catalogue(&server).heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogueError::Unreachable(_)));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(OllamaCatalogue::new("not a url", Duration::from_secs(1)).is_err());
    }
}
