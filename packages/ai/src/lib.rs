// ABOUTME: Model gateway integration for the RLM engine
// ABOUTME: Gateway trait plus an OpenAI-compatible client for local model servers

pub mod gateway;
pub mod service;

// Re-export gateway contract
pub use gateway::{ModelGateway, TextStream};

// Re-export service types
pub use service::{AIServiceError, AIServiceResult, LocalModelService, ModelServiceConfig};
