//! Language model provider for murmur.
//!
//! [`OpenRouterProvider`] implements `murmur_core::Provider` against the
//! OpenRouter chat-completions API. [`decode`] turns whatever the model sends
//! back into a typed value without ever failing. [`ScriptedProvider`] replays
//! canned answers for dry runs and tests.

pub mod decode;
pub mod openrouter;
pub mod scripted;

pub use decode::{decode_structured, decode_with_stage, DecodeStage};
pub use openrouter::OpenRouterProvider;
pub use scripted::{image_response, text_response, ScriptedProvider};
