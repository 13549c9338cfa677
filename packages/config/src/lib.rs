// ABOUTME: Configuration package for the RLM engine
// ABOUTME: Environment variable names plus typed, validated runtime settings

pub mod constants;
pub mod settings;

pub use settings::{
    CallbackConfig, ConfigError, ExplorerConfig, ModelConfig, RlmConfig, SandboxConfig,
};
