//! OpenAI-compatible API client.
//!
//! One struct covers both endpoints the bot needs: `/chat/completions` for
//! prose and `/images/generations` for the post photo. Providers differ only
//! by base URL and key.

use serde_json::{json, Value};

use roamcast_core::error::{Result, RoamcastError};

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn check_key(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RoamcastError::ApiKeyMissing("openai".into()));
        }
        Ok(())
    }

    /// Single-turn chat completion; returns the assistant text.
    pub async fn chat(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        self.check_key()?;

        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RoamcastError::Http(format!("chat connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RoamcastError::Provider(format!(
                "chat API error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RoamcastError::Http(e.to_string()))?;

        json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| RoamcastError::Provider("No choices in chat response".into()))
    }

    /// Generate one image; returns its URL.
    pub async fn generate_image(&self, model: &str, prompt: &str, size: &str) -> Result<String> {
        self.check_key()?;

        let body = json!({
            "model": model,
            "prompt": prompt,
            "size": size,
            "quality": "standard",
            "n": 1,
        });

        let url = format!("{}/images/generations", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RoamcastError::Http(format!("image connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RoamcastError::Provider(format!(
                "image API error {status}: {text}"
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| RoamcastError::Http(e.to_string()))?;

        json["data"]
            .get(0)
            .and_then(|d| d["url"].as_str())
            .map(String::from)
            .ok_or_else(|| RoamcastError::Provider("No image URL in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_rejected_before_any_request() {
        let client = OpenAiClient::new("", "https://api.openai.com/v1");
        let err = client.chat("gpt-4o-mini", "hi", 0.7, 10).await.unwrap_err();
        assert!(matches!(err, RoamcastError::ApiKeyMissing(_)));

        let err = client
            .generate_image("dall-e-3", "a beach", "1024x1024")
            .await
            .unwrap_err();
        assert!(matches!(err, RoamcastError::ApiKeyMissing(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new("k", "https://api.openai.com/v1/");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
