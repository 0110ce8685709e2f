//! panelscore-providers: Completion service integration.
//!
//! Implements the `CompletionClient` trait for OpenAI-compatible, DeepSeek,
//! Anthropic and local endpoints through a single HTTP client, and loads the
//! provider configuration.

pub mod client;
pub mod config;
pub mod mock;

pub use client::{ExternalCompletionClient, ProviderFormat};
pub use config::{create_client, load_config, load_config_from, PanelConfig, ProviderConfig};
pub use mock::MockCompletionClient;
pub use panelscore_core::error::ProviderError;
