//! Shared LLM plumbing for the syllabus backend.
//!
//! Two logical profiles are served from one [`service_profiles::LlmServiceProfiles`]:
//! a **chat** model that writes answers and an **embedding** model that turns
//! chunks and questions into vectors. OpenAI and Ollama are supported.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::{GenerationParams, LlmModelConfig};
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
