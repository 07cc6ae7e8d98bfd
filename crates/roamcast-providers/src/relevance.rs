//! Comment relevance filter.
//!
//! Decides whether the latest group comment should season the next post.
//! Failure of the classifier is never an error: no context is always an
//! acceptable outcome.

use roamcast_core::config::LlmConfig;
use roamcast_core::types::truncate_chars;

use crate::openai::OpenAiClient;

/// Comments are cut to this length before classification.
pub const COMMENT_MAX_CHARS: usize = 500;

pub struct RelevanceFilter {
    client: OpenAiClient,
    model: String,
}

impl RelevanceFilter {
    pub fn new(client: OpenAiClient, llm: &LlmConfig) -> Self {
        Self {
            client,
            model: llm.text_model.clone(),
        }
    }

    /// Returns the (truncated) comment when the oracle calls it travel
    /// related, otherwise `None`. Oracle failure also yields `None`.
    pub async fn filter(&self, comment: &str) -> Option<String> {
        let comment = comment.trim();
        if comment.is_empty() {
            return None;
        }
        let truncated = truncate_chars(comment, COMMENT_MAX_CHARS);

        let prompt = format!(
            "Определи, относится ли следующий текст к тематике путешествий.\n\
             Ответь только YES или NO.\n\
             Текст:\n{truncated}"
        );

        match self.client.chat(&self.model, &prompt, 0.0, 10).await {
            Ok(answer) if is_affirmative(&answer) => {
                tracing::info!("💬 Comment accepted as context: {}…", preview(&truncated));
                Some(truncated)
            }
            Ok(_) => {
                tracing::info!("Comment off-topic, skipping: {}…", preview(&truncated));
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Relevance check failed, posting without context: {e}");
                None
            }
        }
    }
}

/// The oracle is told to answer YES or NO; accept minor decoration.
fn is_affirmative(answer: &str) -> bool {
    answer
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .eq_ignore_ascii_case("yes")
}

fn preview(s: &str) -> String {
    truncate_chars(s, 50)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("yes"));
        assert!(is_affirmative(" Yes. "));
        assert!(!is_affirmative("NO"));
        assert!(!is_affirmative("maybe yes"));
        assert!(!is_affirmative(""));
    }

    #[tokio::test]
    async fn test_empty_comment_short_circuits() {
        // No API key, no network: an empty comment must not even try.
        let filter = RelevanceFilter::new(
            OpenAiClient::new("", "https://api.openai.com/v1"),
            &LlmConfig::default(),
        );
        assert_eq!(filter.filter("   ").await, None);
    }

    #[tokio::test]
    async fn test_oracle_failure_yields_none_not_error() {
        // Missing key makes the oracle call fail instantly; the filter must
        // swallow that and return None.
        let filter = RelevanceFilter::new(
            OpenAiClient::new("", "https://api.openai.com/v1"),
            &LlmConfig::default(),
        );
        assert_eq!(filter.filter("Посоветуйте маршрут по Алтаю").await, None);
    }

    #[test]
    fn test_truncation_cap() {
        let long = "и".repeat(2 * COMMENT_MAX_CHARS);
        assert_eq!(
            truncate_chars(&long, COMMENT_MAX_CHARS).chars().count(),
            COMMENT_MAX_CHARS
        );
    }
}
