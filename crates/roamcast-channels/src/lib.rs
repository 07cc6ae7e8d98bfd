//! # Roamcast Channels
//! Outbound publishing paths: the Telegram Bot API channel and the
//! polymorphic delivery adapter (direct vs relay).

pub mod delivery;
pub mod telegram;

pub use delivery::{Delivery, Outcome};
pub use telegram::TelegramChannel;
