//! Environment variable loading, for overriding `CrawlConfig` defaults at
//! process start. Kept from the teacher's `riptide-config::env` almost
//! verbatim — it was already self-contained once the (non-existent)
//! `builder`/`validation` module dependencies are dropped.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment loading errors
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Environment variable not found: {var}")]
    NotFound { var: String },

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("Type conversion error for {var}: {reason}")]
    ConversionError { var: String, reason: String },
}

/// Environment configuration loader
pub struct EnvConfigLoader {
    prefix: Option<String>,
    required: Vec<String>,
    defaults: HashMap<String, String>,
}

impl EnvConfigLoader {
    pub fn new() -> Self {
        Self {
            prefix: None,
            required: Vec::new(),
            defaults: HashMap::new(),
        }
    }

    /// Set prefix for environment variables (e.g., "DOCSPIDER_")
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn require(mut self, var: impl Into<String>) -> Self {
        self.required.push(var.into());
        self
    }

    pub fn default(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(var.into(), value.into());
        self
    }

    pub fn get(&self, var: &str) -> Result<String, EnvError> {
        let full_var = self.make_var_name(var);

        env::var(&full_var).or_else(|_| {
            self.defaults
                .get(var)
                .cloned()
                .ok_or_else(|| EnvError::NotFound {
                    var: full_var.clone(),
                })
        })
    }

    pub fn get_optional(&self, var: &str) -> Option<String> {
        let full_var = self.make_var_name(var);
        env::var(&full_var)
            .ok()
            .or_else(|| self.defaults.get(var).cloned())
    }

    pub fn get_int(&self, var: &str) -> Result<i64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as integer: {}", e),
        })
    }

    pub fn get_uint(&self, var: &str) -> Result<u64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as unsigned integer: {}", e),
        })
    }

    pub fn get_float(&self, var: &str) -> Result<f64, EnvError> {
        let value = self.get(var)?;
        value.parse().map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as float: {}", e),
        })
    }

    pub fn get_bool(&self, var: &str) -> Result<bool, EnvError> {
        let value = self.get(var)?;
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(EnvError::InvalidValue {
                var: self.make_var_name(var),
                reason: format!("Invalid boolean value: {}", value),
            }),
        }
    }

    /// Supports "30s", "5m", "1h", "500ms" format.
    pub fn get_duration(&self, var: &str) -> Result<Duration, EnvError> {
        let value = self.get(var)?;
        parse_duration(&value).map_err(|e| EnvError::ConversionError {
            var: self.make_var_name(var),
            reason: format!("Cannot parse as duration: {}", e),
        })
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        for var in &self.required {
            self.get(var)?;
        }
        Ok(())
    }

    fn make_var_name(&self, var: &str) -> String {
        if let Some(ref prefix) = self.prefix {
            format!("{}{}", prefix, var.to_uppercase())
        } else {
            var.to_uppercase()
        }
    }
}

impl Default for EnvConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    if let Some(stripped) = s.strip_suffix("ms") {
        let num = stripped
            .parse::<u64>()
            .map_err(|e| format!("Invalid milliseconds: {}", e))?;
        Ok(Duration::from_millis(num))
    } else if let Some(stripped) = s.strip_suffix('s') {
        let num = stripped
            .parse::<u64>()
            .map_err(|e| format!("Invalid seconds: {}", e))?;
        Ok(Duration::from_secs(num))
    } else if let Some(stripped) = s.strip_suffix('m') {
        let num = stripped
            .parse::<u64>()
            .map_err(|e| format!("Invalid minutes: {}", e))?;
        Ok(Duration::from_secs(num * 60))
    } else if let Some(stripped) = s.strip_suffix('h') {
        let num = stripped
            .parse::<u64>()
            .map_err(|e| format!("Invalid hours: {}", e))?;
        Ok(Duration::from_secs(num * 3600))
    } else if let Ok(num) = s.parse::<u64>() {
        Ok(Duration::from_secs(num))
    } else {
        Err(format!("Invalid duration format: {}", s))
    }
}

/// Apply `DOCSPIDER_`-prefixed environment overrides onto an existing
/// config. Only overrides values actually present in the environment;
/// unset variables leave the field untouched.
pub fn apply_env_overrides(
    mut config: crate::crawl::CrawlConfig,
) -> Result<crate::crawl::CrawlConfig, EnvError> {
    let loader = EnvConfigLoader::new().with_prefix("DOCSPIDER_");

    if let Some(v) = loader.get_optional("MAX_PAGES") {
        config.max_pages = v.parse().map_err(|e| EnvError::ConversionError {
            var: "DOCSPIDER_MAX_PAGES".to_string(),
            reason: format!("{e}"),
        })?;
    }
    if let Some(v) = loader.get_optional("MAX_DEPTH") {
        config.max_depth = v.parse().map_err(|e| EnvError::ConversionError {
            var: "DOCSPIDER_MAX_DEPTH".to_string(),
            reason: format!("{e}"),
        })?;
    }
    if let Some(v) = loader.get_optional("MAX_CONCURRENCY") {
        config.max_concurrency = v.parse().map_err(|e| EnvError::ConversionError {
            var: "DOCSPIDER_MAX_CONCURRENCY".to_string(),
            reason: format!("{e}"),
        })?;
    }
    if loader.get_optional("USER_AGENT").is_some() {
        config.user_agent = loader.get("USER_AGENT")?;
    }
    if loader.get_optional("BUS_TOPIC").is_some() {
        config.bus_topic = loader.get("BUS_TOPIC")?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_loader_basic() {
        env::set_var("TEST_VALUE", "123");
        env::set_var("TEST_BOOL", "true");
        env::set_var("TEST_DURATION", "30s");

        let loader = EnvConfigLoader::new().with_prefix("TEST_");

        assert_eq!(loader.get("VALUE").unwrap(), "123");
        assert_eq!(loader.get_int("VALUE").unwrap(), 123);
        assert!(loader.get_bool("BOOL").unwrap());
        assert_eq!(
            loader.get_duration("DURATION").unwrap(),
            Duration::from_secs(30)
        );

        env::remove_var("TEST_VALUE");
        env::remove_var("TEST_BOOL");
        env::remove_var("TEST_DURATION");
    }

    #[test]
    fn test_env_loader_defaults() {
        let loader = EnvConfigLoader::new()
            .with_prefix("MISSING_")
            .default("timeout", "60")
            .default("enabled", "true");

        assert_eq!(loader.get("timeout").unwrap(), "60");
        assert_eq!(loader.get_int("timeout").unwrap(), 60);
        assert!(loader.get_bool("enabled").unwrap());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn apply_env_overrides_only_touches_set_vars() {
        env::remove_var("DOCSPIDER_MAX_PAGES");
        env::set_var("DOCSPIDER_MAX_CONCURRENCY", "9");

        let config = apply_env_overrides(crate::crawl::CrawlConfig::default()).unwrap();
        assert_eq!(config.max_pages, 20); // untouched default
        assert_eq!(config.max_concurrency, 9);

        env::remove_var("DOCSPIDER_MAX_CONCURRENCY");
    }
}
