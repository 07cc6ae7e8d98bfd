//! Polymorphic delivery — direct Telegram publish or relay hand-off.

use roamcast_core::error::{Result, RoamcastError};
use roamcast_core::types::Post;

use crate::telegram::TelegramChannel;

/// Where a generated post goes.
///
/// Direct pushes to the Telegram Bot API; the caller marks the schedule
/// posted only after `deliver` returns Ok. Relay never pushes anywhere — the
/// post rides back in the HTTP response and the external automation tool does
/// the sending. In relay mode the schedule is advanced at hand-off, before
/// the relay's own outcome is known; that outcome is simply not observable
/// from here.
pub enum Delivery {
    Direct(TelegramChannel),
    Relay,
}

/// What `deliver` did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Post is live in the group.
    Published {
        photo_message_id: Option<String>,
        text_message_id: Option<String>,
    },
    /// Post handed to the relay caller.
    Handoff,
}

impl Delivery {
    pub fn is_relay(&self) -> bool {
        matches!(self, Delivery::Relay)
    }

    /// Publish the post to the group, or report hand-off in relay mode.
    ///
    /// Direct mode sends the photo with its caption first, then the body
    /// text. Any send failure propagates — a half-delivered post must not be
    /// marked as sent.
    pub async fn deliver(&self, group_id: &str, post: &Post) -> Result<Outcome> {
        match self {
            Delivery::Relay => Ok(Outcome::Handoff),
            Delivery::Direct(channel) => {
                let mut photo_message_id = None;
                if let Some(url) = &post.photo_url {
                    let id = channel
                        .send_photo(group_id, url, &post.photo_caption)
                        .await
                        .map_err(|e| RoamcastError::Delivery(e.to_string()))?;
                    photo_message_id = Some(id);
                }

                let text_message_id = if !post.body_text.trim().is_empty() {
                    Some(
                        channel
                            .send_message(group_id, &post.body_text)
                            .await
                            .map_err(|e| RoamcastError::Delivery(e.to_string()))?,
                    )
                } else if photo_message_id.is_none() && !post.full_text.trim().is_empty() {
                    // No photo and no separable body: the whole post goes out
                    // as one message.
                    Some(
                        channel
                            .send_message(group_id, &post.full_text)
                            .await
                            .map_err(|e| RoamcastError::Delivery(e.to_string()))?,
                    )
                } else {
                    None
                };

                tracing::info!(
                    "📤 Post published to {group_id} (photo: {:?}, text: {:?})",
                    photo_message_id,
                    text_message_id
                );
                Ok(Outcome::Published {
                    photo_message_id,
                    text_message_id,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relay_hands_off_without_network() {
        let delivery = Delivery::Relay;
        let post = Post::compose("Заголовок\n\nТело", Some("https://img".into()));
        let outcome = delivery.deliver("-100", &post).await.unwrap();
        assert_eq!(outcome, Outcome::Handoff);
    }

    #[test]
    fn test_is_relay() {
        assert!(Delivery::Relay.is_relay());
        assert!(!Delivery::Direct(TelegramChannel::new("t")).is_relay());
    }
}
