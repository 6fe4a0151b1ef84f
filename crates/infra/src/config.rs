//! Process configuration read from environment variables.
//!
//! Every value except the model API key has a default; the key is only
//! needed when the model is not reached through Bedrock. A malformed value is a
//! [`ConfigError`], never a silent fallback. Durations are given in seconds
//! and may be fractional (`2.5`).

use std::net::SocketAddr;
use std::time::Duration;

use deckgen_core::OutputLayout;

use crate::callback::RetryPolicy;
use crate::generation::ModelSettings;
use crate::pipeline::PipelineSettings;
use crate::storage::StorageSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Callback delivery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSettings {
    pub retry: RetryPolicy,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
}

impl CallbackSettings {
    /// Upper bound on one callback delivery, retries included.
    pub fn worst_case_delivery(&self) -> Duration {
        self.retry.worst_case(self.timeout)
    }
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub storage: StorageSettings,
    pub output: OutputLayout,
    pub model: ModelSettings,
    pub callback: CallbackSettings,
    /// Total time budget of one invocation.
    pub deadline: Duration,
    /// Slice of the budget kept back for the final callback. Never shorter
    /// than the callback's worst-case delivery.
    pub deadline_reserve: Duration,
    pub bind_addr: SocketAddr,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let storage_defaults = StorageSettings::default();
        let storage = StorageSettings {
            bucket: env.string("S3_BUCKET").unwrap_or(storage_defaults.bucket),
            region: env.string("AWS_REGION").unwrap_or(storage_defaults.region),
            endpoint_url: env.string("S3_ENDPOINT_URL"),
            force_path_style: env.parse_bool("S3_FORCE_PATH_STYLE")?.unwrap_or(false),
        };

        let layout_defaults = OutputLayout::default();
        let output = OutputLayout::new(
            env.string("OUTPUT_PREFIX")
                .unwrap_or_else(|| layout_defaults.prefix().to_string()),
            env.string("OUTPUT_OBJECT_NAME")
                .unwrap_or_else(|| layout_defaults.object_name().to_string()),
        );

        let model_defaults = ModelSettings::default();
        let use_bedrock = env.parse_bool("USE_BEDROCK")?.unwrap_or(model_defaults.use_bedrock);
        let api_key = match env.string("ANTHROPIC_API_KEY") {
            Some(key) => key,
            None if use_bedrock => String::new(),
            None => return Err(ConfigError::Missing("ANTHROPIC_API_KEY")),
        };
        let model = ModelSettings {
            api_key,
            use_bedrock,
            base_url: env.string("ANTHROPIC_BASE_URL").unwrap_or(model_defaults.base_url),
            max_tokens: env.parse_num("LLM_MAX_TOKENS")?.unwrap_or(model_defaults.max_tokens),
            temperature: env.parse_num("LLM_TEMPERATURE")?.unwrap_or(model_defaults.temperature),
            timeout: env.seconds("LLM_TIMEOUT")?.unwrap_or(model_defaults.timeout),
        };

        let callback_defaults = CallbackSettings::default();
        let callback = CallbackSettings {
            retry: RetryPolicy::linear(
                env.parse_num("MAX_RETRIES")?.unwrap_or(callback_defaults.retry.max_attempts),
                env.seconds("CALLBACK_RETRY_DELAY")?.unwrap_or(callback_defaults.retry.base_delay),
            ),
            timeout: env.seconds("CALLBACK_TIMEOUT")?.unwrap_or(callback_defaults.timeout),
        };

        let deadline = env.seconds("JOB_DEADLINE")?.unwrap_or(Duration::from_secs(900));
        let delivery = callback.worst_case_delivery();
        let deadline_reserve = env.seconds("DEADLINE_RESERVE")?.unwrap_or(delivery);
        if deadline_reserve < delivery {
            return Err(ConfigError::Invalid {
                var: "DEADLINE_RESERVE",
                value: format!("{}", deadline_reserve.as_secs_f64()),
                reason: format!(
                    "must cover the worst-case callback delivery of {}s \
                     (MAX_RETRIES x CALLBACK_TIMEOUT plus backoff)",
                    delivery.as_secs_f64()
                ),
            });
        }
        if deadline_reserve >= deadline {
            return Err(ConfigError::Invalid {
                var: "DEADLINE_RESERVE",
                value: format!("{}", deadline_reserve.as_secs_f64()),
                reason: "must be shorter than JOB_DEADLINE".to_string(),
            });
        }

        Ok(Self {
            storage,
            output,
            model,
            callback,
            deadline,
            deadline_reserve,
            bind_addr: env.parse_num("BIND_ADDR")?.unwrap_or(SocketAddr::from(([0, 0, 0, 0], 8080))),
        })
    }

    pub fn pipeline(&self) -> PipelineSettings {
        PipelineSettings {
            layout: self.output.clone(),
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
            deadline_reserve: self.deadline_reserve,
        }
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are the same.
    fn string(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_num<T>(&self, var: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(var)
            .map(|value| {
                value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    var,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn parse_bool(&self, var: &'static str) -> Result<Option<bool>, ConfigError> {
        self.string(var)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    var,
                    value,
                    reason: "expected true or false".to_string(),
                }),
            })
            .transpose()
    }

    fn seconds(&self, var: &'static str) -> Result<Option<Duration>, ConfigError> {
        let Some(secs) = self.parse_num::<f64>(var)? else {
            return Ok(None);
        };
        Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                value: secs.to_string(),
                reason: e.to_string(),
            })
    }
}
