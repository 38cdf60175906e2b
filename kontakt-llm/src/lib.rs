//! Provider-agnostic language-model access for Kontakt.
//!
//! The form matcher treats the model as an opaque oracle: one prompt in, one
//! JSON object out. This crate exposes the [`traits::LlmClient`] seam and two
//! implementations, an OpenAI-compatible chat client and a local Ollama client.
//!
//! # Examples
//! ```no_run
//! use kontakt_llm::{openai::OpenAiClient, traits::LlmClient};
//!
//! # #[tokio::main]
//! # async fn main() -> kontakt_common::Result<()> {
//! let client = OpenAiClient::new("sk-...".into(), kontakt_llm::DEFAULT_OPENAI_MODEL.into())?;
//! let reply = client
//!     .generate("{\"ping\":true}", Some("Reply with a JSON object."), Some(16), Some(0.0))
//!     .await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```
pub mod ollama;
pub mod openai;
pub mod traits;

/// Default models for field-mapping requests.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
