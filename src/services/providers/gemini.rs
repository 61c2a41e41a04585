/// Gemini embedding provider
///
/// Calls `POST /v1beta/models/{model}:embedContent` with the task type hint and
/// returns the single embedding in the response.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::providers::{EmbeddingProvider, TaskType},
};

#[derive(Clone)]
pub struct GeminiEmbeddingProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

impl GeminiEmbeddingProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn build_request<'a>(&self, text: &'a str, task: TaskType) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: task.as_gemini(),
        }
    }

    fn extract_vector(response: EmbedContentResponse) -> AppResult<Vec<f32>> {
        response
            .embedding
            .map(|e| e.values)
            .filter(|values| !values.is_empty())
            .ok_or_else(|| AppError::Provider("Gemini returned an empty embedding".to_string()))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str, task: TaskType) -> AppResult<Vec<f32>> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Provider("Gemini API key is not configured".to_string()));
        }

        let url = format!("{}/v1beta/models/{}:embedContent", self.api_url, self.model);

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(text, task))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        let parsed: EmbedContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize Gemini embedding response"
            );
            AppError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        let vector = Self::extract_vector(parsed)?;

        tracing::debug!(
            model = %self.model,
            task = %task,
            dim = vector.len(),
            provider = "gemini",
            "Embedding generated"
        );

        Ok(vector)
    }

    fn model_id(&self) -> String {
        self.model.clone()
    }
}
