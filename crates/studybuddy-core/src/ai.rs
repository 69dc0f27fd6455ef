//! AI study coach.
//!
//! Forwards the current task list to a chat-completion API with a short
//! templated prompt and returns the model's suggestion. An empty or
//! missing completion falls back to a fixed message.

use serde_json::json;

use crate::config::AiConfig;
use crate::error::AiError;
use crate::task::Task;

/// Returned when the model produces no usable content.
pub const FALLBACK_SUGGESTION: &str = "Unable to generate a suggestion right now.";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completion client for study suggestions.
pub struct SuggestionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl SuggestionClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns `MissingApiKey` when no API key is configured.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config.api_key.clone().ok_or(AiError::MissingApiKey)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Point the client at a different API root (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ask the model for one short suggestion about the given tasks.
    pub async fn suggest(&self, tasks: &[Task]) -> Result<String, AiError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(tasks) }],
            "max_tokens": 200,
            "temperature": 0.5,
        });

        let resp: serde_json::Value = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.get("error") {
            return Err(AiError::Api(err.to_string()));
        }

        let suggestion = resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_SUGGESTION);

        Ok(suggestion.to_string())
    }
}

/// Render the task list into the coaching prompt.
fn build_prompt(tasks: &[Task]) -> String {
    let mut lines = String::new();
    for task in tasks {
        lines.push_str(&format!(
            "- {} ({}, due {}, {})\n",
            task.title,
            task.priority,
            task.deadline.format("%Y-%m-%d"),
            task.status,
        ));
    }

    format!(
        "You are a study assistant. Analyze these tasks and give exactly one \
         concrete suggestion (2-3 sentences):\n\n{lines}\n\
         Give brief advice on which task to do first, how to organize the \
         time, or encouragement. End with a period."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, Status};
    use chrono::{TimeZone, Utc};

    fn sample_task(title: &str) -> Task {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        Task {
            id: "t1".to_string(),
            title: title.to_string(),
            description: None,
            deadline: Utc.with_ymd_and_hms(2025, 6, 12, 9, 0, 0).unwrap(),
            priority: Priority::High,
            estimate_minutes: 60,
            status: Status::Todo,
            google_event_id: None,
            google_calendar_id: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn client(base_url: &str) -> SuggestionClient {
        SuggestionClient::from_config(&AiConfig {
            api_key: Some("test-key".to_string()),
            model: "gpt-4o-mini".to_string(),
        })
        .unwrap()
        .with_base_url(base_url)
    }

    #[test]
    fn prompt_lists_every_task() {
        let tasks = vec![sample_task("Ôn tập Toán"), sample_task("Physics lab")];
        let prompt = build_prompt(&tasks);
        assert!(prompt.contains("Ôn tập Toán"));
        assert!(prompt.contains("Physics lab"));
        assert!(prompt.contains("high"));
        assert!(prompt.contains("2025-06-12"));
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let result = SuggestionClient::from_config(&AiConfig {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        });
        assert!(matches!(result, Err(AiError::MissingApiKey)));
    }

    #[tokio::test]
    async fn suggest_returns_completion_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":" Start with math. "}}]}"#,
            )
            .create_async()
            .await;

        let suggestion = client(&server.url())
            .suggest(&[sample_task("Math")])
            .await
            .unwrap();
        assert_eq!(suggestion, "Start with math.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_completion_falls_back() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#)
            .create_async()
            .await;

        let suggestion = client(&server.url())
            .suggest(&[sample_task("Math")])
            .await
            .unwrap();
        assert_eq!(suggestion, FALLBACK_SUGGESTION);
    }

    #[tokio::test]
    async fn api_error_payload_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"error":{"message":"quota exceeded"}}"#)
            .create_async()
            .await;

        let result = client(&server.url()).suggest(&[sample_task("Math")]).await;
        assert!(matches!(result, Err(AiError::Api(_))));
    }
}
