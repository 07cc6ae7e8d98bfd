//! Post generator — composes prose, hashtags, and an image into a `Post`.
//!
//! Text and image are load-bearing: if either oracle fails outright the whole
//! generation fails and nothing is marked posted. Hashtags and the image
//! prompt are decoration with static fallbacks.

use roamcast_core::config::LlmConfig;
use roamcast_core::error::{Result, RoamcastError};
use roamcast_core::types::{truncate_chars, Post};

use crate::openai::OpenAiClient;

const BASE_PROMPT: &str = "\
Напиши текстовый пост для Telegram на русском языке на тему путешествий.
Требования:
1. Цепляющий заголовок в первой строке, затем пустая строка.
2. Основной текст 1000–1500 символов, абзацы по 2–4 строки.
3. Живой и вдохновляющий язык, не более 5–7 эмодзи.
4. Без кавычек, HTML-тегов, Markdown-разметки и маркированных списков.
5. В конце короткий вовлекающий вопрос к читателю.
Тематика: советы путешественникам, интересные места, необычные маршруты.";

const HASHTAG_PROMPT: &str = "\
Создай 3-5 релевантных хештегов для следующего поста о путешествиях.
Выведи их в одну строку через пробел, без запятых и без другого текста.
Пост:";

const IMAGE_PROMPT_INSTRUCTION: &str = "\
Based on the following Telegram travel post, write a detailed cinematic
visual prompt in English for image generation. Describe environment,
atmosphere, lighting, camera angle, mood, realistic style.
Post:";

const FALLBACK_HASHTAGS: &str = "#путешествия #путешественникам #отдых";

const DEFAULT_IMAGE_PROMPT: &str =
    "Beautiful travel destination, cinematic style, natural lighting";

pub struct PostGenerator {
    client: OpenAiClient,
    llm: LlmConfig,
}

impl PostGenerator {
    pub fn new(client: OpenAiClient, llm: LlmConfig) -> Self {
        Self { client, llm }
    }

    /// Generate a complete post, optionally seasoned with a group comment.
    pub async fn generate(&self, context: Option<&str>) -> Result<Post> {
        let prompt = build_prompt(context);
        let text = self
            .client
            .chat(
                &self.llm.text_model,
                &prompt,
                self.llm.temperature,
                self.llm.max_tokens,
            )
            .await
            .map_err(|e| RoamcastError::Generation(format!("text oracle: {e}")))?;

        let hashtags = self.hashtags(&text).await;
        let full_text = format!("{text}\n\n{hashtags}");

        let image_prompt = self.image_prompt(&full_text).await;
        let photo_url = self
            .client
            .generate_image(&self.llm.image_model, &image_prompt, &self.llm.image_size)
            .await
            .map_err(|e| RoamcastError::Generation(format!("image oracle: {e}")))?;

        Ok(Post::compose(&full_text, Some(photo_url)))
    }

    async fn hashtags(&self, post_text: &str) -> String {
        // Cap the excerpt to keep token spend predictable.
        let prompt = format!("{HASHTAG_PROMPT}\n{}", truncate_chars(post_text, 1000));
        match self.client.chat(&self.llm.text_model, &prompt, 0.3, 100).await {
            Ok(tags) if tags.starts_with('#') => tags,
            Ok(tags) if !tags.is_empty() => format!("#{}", tags.replace(' ', " #")),
            Ok(_) => FALLBACK_HASHTAGS.to_string(),
            Err(e) => {
                tracing::warn!("⚠️ Hashtag generation failed, using fallback: {e}");
                FALLBACK_HASHTAGS.to_string()
            }
        }
    }

    async fn image_prompt(&self, post_text: &str) -> String {
        let prompt = format!(
            "{IMAGE_PROMPT_INSTRUCTION}\n{}",
            truncate_chars(post_text, 1500)
        );
        match self.client.chat(&self.llm.text_model, &prompt, 0.7, 300).await {
            Ok(p) if !p.is_empty() => p,
            _ => {
                tracing::warn!("⚠️ Image prompt generation failed, using default");
                DEFAULT_IMAGE_PROMPT.to_string()
            }
        }
    }
}

fn build_prompt(context: Option<&str>) -> String {
    match context {
        Some(comment) => format!(
            "{BASE_PROMPT}\n\nДополнительно учти комментарий участника группы:\n\
             {comment}\nОрганично интегрируй его смысл в пост."
        ),
        None => BASE_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_without_context() {
        let prompt = build_prompt(None);
        assert_eq!(prompt, BASE_PROMPT);
    }

    #[test]
    fn test_build_prompt_weaves_in_comment() {
        let prompt = build_prompt(Some("Хочу в Грузию осенью"));
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.contains("Хочу в Грузию осенью"));
    }

    #[tokio::test]
    async fn test_text_oracle_failure_is_generation_error() {
        let generator = PostGenerator::new(
            OpenAiClient::new("", "https://api.openai.com/v1"),
            LlmConfig::default(),
        );
        let err = generator.generate(None).await.unwrap_err();
        assert!(matches!(err, RoamcastError::Generation(_)));
    }

    #[test]
    fn test_fallback_hashtags_shape() {
        assert!(FALLBACK_HASHTAGS.starts_with('#'));
        assert!(FALLBACK_HASHTAGS.split_whitespace().all(|t| t.starts_with('#')));
    }
}
