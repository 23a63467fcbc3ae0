//! Concrete adapters behind the engine ports.

pub mod clock;
pub mod notify;
pub mod ollama;
pub mod persistence;
pub mod resilient_llm;

pub use clock::SystemClock;
pub use notify::TracingNotifier;
pub use ollama::OllamaClient;
pub use resilient_llm::{ResilientLlmClient, RetryConfig};
