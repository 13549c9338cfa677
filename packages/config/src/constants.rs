// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across the RLM engine

// Model Server Configuration
pub const RLM_MODEL_BASE_URL: &str = "RLM_MODEL_BASE_URL";
pub const RLM_MODEL_NAME: &str = "RLM_MODEL_NAME";
pub const RLM_MODEL_API_KEY: &str = "RLM_MODEL_API_KEY";
pub const RLM_MODEL_TIMEOUT_SECS: &str = "RLM_MODEL_TIMEOUT_SECS";
pub const RLM_EXPLORER_MODEL_NAME: &str = "RLM_EXPLORER_MODEL_NAME";

// Sandbox Configuration
pub const RLM_SANDBOX_URL: &str = "RLM_SANDBOX_URL";
pub const RLM_SANDBOX_TIMEOUT_SECS: &str = "RLM_SANDBOX_TIMEOUT_SECS";

// Recursive Callback Listener
pub const RLM_CALLBACK_HOST: &str = "RLM_CALLBACK_HOST";
pub const RLM_CALLBACK_PORT: &str = "RLM_CALLBACK_PORT";

// Recursion Limits
pub const RLM_MAX_DEPTH: &str = "RLM_MAX_DEPTH";

// Chunk Explorer
pub const RLM_EXPLORER_WINDOW_LINES: &str = "RLM_EXPLORER_WINDOW_LINES";
pub const RLM_EXPLORER_OVERLAP_LINES: &str = "RLM_EXPLORER_OVERLAP_LINES";
pub const RLM_EXPLORER_MAX_FILES: &str = "RLM_EXPLORER_MAX_FILES";
pub const RLM_EXPLORER_MAX_CHUNKS: &str = "RLM_EXPLORER_MAX_CHUNKS";
pub const RLM_EXPLORER_MAX_CONCURRENT: &str = "RLM_EXPLORER_MAX_CONCURRENT";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
