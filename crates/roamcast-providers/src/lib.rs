//! # Roamcast Providers
//!
//! Clients for the external generative oracles: an OpenAI-compatible chat
//! endpoint for prose, hashtags, and relevance classification, and an image
//! endpoint for the post photo.

pub mod generator;
pub mod openai;
pub mod relevance;

pub use generator::PostGenerator;
pub use openai::OpenAiClient;
pub use relevance::RelevanceFilter;
