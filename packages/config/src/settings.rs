// ABOUTME: Typed runtime configuration loaded from environment variables
// ABOUTME: Applies defaults and range checks for model, sandbox, callback, and explorer settings

use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::constants::*;

pub const DEFAULT_MODEL_BASE_URL: &str = "http://127.0.0.1:1234/v1";
pub const DEFAULT_MODEL_NAME: &str = "local-model";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_SANDBOX_URL: &str = "http://127.0.0.1:8100";
pub const DEFAULT_SANDBOX_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CALLBACK_HOST: &str = "127.0.0.1";
pub const DEFAULT_CALLBACK_PORT: u16 = 8095;
pub const DEFAULT_MAX_DEPTH: u32 = 5;
pub const MAX_DEPTH_LIMIT: u32 = 10;
pub const DEFAULT_WINDOW_LINES: usize = 200;
pub const DEFAULT_OVERLAP_LINES: usize = 20;
pub const DEFAULT_MAX_FILES: usize = 20;
pub const DEFAULT_MAX_CHUNKS: usize = 100;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("{var} is out of valid range ({min}-{max}): {value}")]
    OutOfRange {
        var: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("Explorer overlap ({overlap}) must be smaller than the window ({window})")]
    InvalidOverlap { window: usize, overlap: usize },
}

/// Connection settings for the local language-model server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Secondary model used for chunk summarization
    pub explorer_model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Address the recursive-callback listener binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackConfig {
    pub host: String,
    pub port: u16,
}

impl CallbackConfig {
    /// Base URL advertised to the sandbox for recursive calls
    pub fn callback_url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub window_lines: usize,
    pub overlap_lines: usize,
    pub max_files: usize,
    pub max_chunks: usize,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlmConfig {
    pub model: ModelConfig,
    pub sandbox: SandboxConfig,
    pub callback: CallbackConfig,
    pub max_depth: u32,
    pub explorer: ExplorerConfig,
}

impl RlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let model_name = get(RLM_MODEL_NAME).unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        let model = ModelConfig {
            base_url: get(RLM_MODEL_BASE_URL)
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string()),
            explorer_model: get(RLM_EXPLORER_MODEL_NAME).unwrap_or_else(|| model_name.clone()),
            model: model_name,
            api_key: get(RLM_MODEL_API_KEY),
            timeout_secs: parse_in_range(
                get(RLM_MODEL_TIMEOUT_SECS),
                RLM_MODEL_TIMEOUT_SECS,
                DEFAULT_MODEL_TIMEOUT_SECS,
                1,
                86_400,
            )?,
        };

        let sandbox = SandboxConfig {
            url: get(RLM_SANDBOX_URL).unwrap_or_else(|| DEFAULT_SANDBOX_URL.to_string()),
            timeout_secs: parse_in_range(
                get(RLM_SANDBOX_TIMEOUT_SECS),
                RLM_SANDBOX_TIMEOUT_SECS,
                DEFAULT_SANDBOX_TIMEOUT_SECS,
                1,
                86_400,
            )?,
        };

        let callback_host =
            get(RLM_CALLBACK_HOST).unwrap_or_else(|| DEFAULT_CALLBACK_HOST.to_string());
        // The sandbox only accepts loopback callbacks
        if !is_loopback_host(&callback_host) {
            return Err(ConfigError::InvalidValue {
                var: RLM_CALLBACK_HOST,
                value: callback_host,
            });
        }

        let callback = CallbackConfig {
            host: callback_host,
            port: parse_in_range(
                get(RLM_CALLBACK_PORT),
                RLM_CALLBACK_PORT,
                DEFAULT_CALLBACK_PORT,
                1,
                u16::MAX,
            )?,
        };

        let max_depth = parse_in_range(
            get(RLM_MAX_DEPTH),
            RLM_MAX_DEPTH,
            DEFAULT_MAX_DEPTH,
            1,
            MAX_DEPTH_LIMIT,
        )?;

        let explorer = ExplorerConfig {
            window_lines: parse_in_range(
                get(RLM_EXPLORER_WINDOW_LINES),
                RLM_EXPLORER_WINDOW_LINES,
                DEFAULT_WINDOW_LINES,
                1,
                100_000,
            )?,
            overlap_lines: parse_in_range(
                get(RLM_EXPLORER_OVERLAP_LINES),
                RLM_EXPLORER_OVERLAP_LINES,
                DEFAULT_OVERLAP_LINES,
                0,
                100_000,
            )?,
            max_files: parse_in_range(
                get(RLM_EXPLORER_MAX_FILES),
                RLM_EXPLORER_MAX_FILES,
                DEFAULT_MAX_FILES,
                1,
                10_000,
            )?,
            max_chunks: parse_in_range(
                get(RLM_EXPLORER_MAX_CHUNKS),
                RLM_EXPLORER_MAX_CHUNKS,
                DEFAULT_MAX_CHUNKS,
                1,
                100_000,
            )?,
            max_concurrent: parse_in_range(
                get(RLM_EXPLORER_MAX_CONCURRENT),
                RLM_EXPLORER_MAX_CONCURRENT,
                DEFAULT_MAX_CONCURRENT,
                1,
                256,
            )?,
        };

        if explorer.overlap_lines >= explorer.window_lines {
            return Err(ConfigError::InvalidOverlap {
                window: explorer.window_lines,
                overlap: explorer.overlap_lines,
            });
        }

        debug!(
            "Loaded RLM configuration: model={} at {}, sandbox={}, callback={}, max_depth={}",
            model.model,
            model.base_url,
            sandbox.url,
            callback.callback_url(),
            max_depth
        );

        Ok(Self {
            model,
            sandbox,
            callback,
            max_depth,
            explorer,
        })
    }
}

impl Default for RlmConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                base_url: DEFAULT_MODEL_BASE_URL.to_string(),
                model: DEFAULT_MODEL_NAME.to_string(),
                explorer_model: DEFAULT_MODEL_NAME.to_string(),
                api_key: None,
                timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            },
            sandbox: SandboxConfig {
                url: DEFAULT_SANDBOX_URL.to_string(),
                timeout_secs: DEFAULT_SANDBOX_TIMEOUT_SECS,
            },
            callback: CallbackConfig {
                host: DEFAULT_CALLBACK_HOST.to_string(),
                port: DEFAULT_CALLBACK_PORT,
            },
            max_depth: DEFAULT_MAX_DEPTH,
            explorer: ExplorerConfig {
                window_lines: DEFAULT_WINDOW_LINES,
                overlap_lines: DEFAULT_OVERLAP_LINES,
                max_files: DEFAULT_MAX_FILES,
                max_chunks: DEFAULT_MAX_CHUNKS,
                max_concurrent: DEFAULT_MAX_CONCURRENT,
            },
        }
    }
}

fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

fn parse_in_range<T>(
    raw: Option<String>,
    var: &'static str,
    default: T,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Display + Copy,
{
    let Some(raw) = raw else {
        return Ok(default);
    };

    let value = raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.clone(),
    })?;

    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            var,
            value: raw,
            min: min.to_string(),
            max: max.to_string(),
        });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = RlmConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RlmConfig::default());
        assert_eq!(config.callback.callback_url(), "http://127.0.0.1:8095");
    }

    #[test]
    fn test_explorer_model_falls_back_to_primary_model() {
        let config = RlmConfig::from_lookup(lookup_from(&[(RLM_MODEL_NAME, "qwen2.5-coder")]))
            .unwrap();
        assert_eq!(config.model.model, "qwen2.5-coder");
        assert_eq!(config.model.explorer_model, "qwen2.5-coder");

        let config = RlmConfig::from_lookup(lookup_from(&[
            (RLM_MODEL_NAME, "qwen2.5-coder"),
            (RLM_EXPLORER_MODEL_NAME, "llama-3.2-3b"),
        ]))
        .unwrap();
        assert_eq!(config.model.explorer_model, "llama-3.2-3b");
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = RlmConfig::from_lookup(lookup_from(&[(RLM_MODEL_API_KEY, "   ")])).unwrap();
        assert_eq!(config.model.api_key, None);
    }

    #[rstest]
    #[case(RLM_MAX_DEPTH, "0")]
    #[case(RLM_MAX_DEPTH, "11")]
    #[case(RLM_CALLBACK_PORT, "0")]
    #[case(RLM_EXPLORER_MAX_CONCURRENT, "0")]
    fn test_out_of_range_values_are_rejected(#[case] var: &'static str, #[case] value: &str) {
        let result = RlmConfig::from_lookup(lookup_from(&[(var, value)]));
        assert!(matches!(result, Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let result = RlmConfig::from_lookup(lookup_from(&[(RLM_MAX_DEPTH, "deep")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                var: RLM_MAX_DEPTH,
                value: "deep".to_string()
            })
        );
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let result = RlmConfig::from_lookup(lookup_from(&[
            (RLM_EXPLORER_WINDOW_LINES, "50"),
            (RLM_EXPLORER_OVERLAP_LINES, "50"),
        ]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidOverlap {
                window: 50,
                overlap: 50
            })
        );
    }

    #[rstest]
    #[case("0.0.0.0")]
    #[case("192.168.1.20")]
    #[case("example.com")]
    #[case("::")]
    fn test_non_loopback_callback_host_is_rejected(#[case] host: &str) {
        let result = RlmConfig::from_lookup(lookup_from(&[(RLM_CALLBACK_HOST, host)]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidValue {
                var: RLM_CALLBACK_HOST,
                value: host.to_string()
            })
        );
    }

    #[rstest]
    #[case("localhost")]
    #[case("127.0.0.2")]
    #[case("::1")]
    fn test_loopback_callback_host_is_accepted(#[case] host: &str) {
        let config = RlmConfig::from_lookup(lookup_from(&[(RLM_CALLBACK_HOST, host)])).unwrap();
        assert_eq!(config.callback.host, host);
    }

    #[test]
    fn test_ipv6_callback_url_is_bracketed() {
        let callback = CallbackConfig {
            host: "::1".to_string(),
            port: 9000,
        };
        assert_eq!(callback.callback_url(), "http://[::1]:9000");
    }
}
