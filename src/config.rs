use std::fs;
use std::path::Path;
use std::time::Duration;

use json::JsonValue;
use log::LevelFilter;

use crate::error::ConfigError;
use crate::pattern::{BlinkPattern, DEFAULT_ON_DURATION};

pub const LED_PIN: u8 = 21; // header pin 40
pub const LISTEN_ADDR: &str = "0.0.0.0:8888";

/// Shortest configurable flash. Keeps every iteration at least this long, so the worker
/// never spins and paints reach the host loop at a bounded rate.
pub const MIN_ON_DURATION: Duration = Duration::from_millis(10);

/// Startup settings. Everything has a default; a JSON file may override any of it.
/// `onDurationMs` below [`MIN_ON_DURATION`] is raised to it.
///
/// ```json
/// { "onDurationMs": 75, "gapPatternMs": [100, 100, 400], "ledPin": 21,
///   "listen": "0.0.0.0:8888", "acceptEula": false, "logLevel": "info" }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub on_duration: Duration,
    pub pattern: BlinkPattern,
    /// BCM pin of the flash LED. `None` runs with the screen light only.
    pub led_pin: Option<u8>,
    pub listen: String,
    pub accept_eula: bool,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            on_duration: DEFAULT_ON_DURATION,
            pattern: BlinkPattern::default(),
            led_pin: Some(LED_PIN),
            listen: LISTEN_ADDR.to_string(),
            accept_eula: false,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Defaults, overridden by the file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Config::parse(&fs::read_to_string(path)?),
            None => Ok(Config::default()),
        }
    }

    pub fn parse(source: &str) -> Result<Config, ConfigError> {
        let doc = json::parse(source)?;
        if !doc.is_object() {
            return Err(invalid("<root>", "expected an object"));
        }

        let mut config = Config::default();
        if let Some(on_ms) = optional(&doc, "onDurationMs") {
            let on_ms = on_ms
                .as_u64()
                .ok_or_else(|| invalid("onDurationMs", "expected a non-negative integer"))?;
            config.on_duration = Duration::from_millis(on_ms).max(MIN_ON_DURATION);
        }
        if let Some(gaps) = optional(&doc, "gapPatternMs") {
            if !gaps.is_array() {
                return Err(invalid("gapPatternMs", "expected an array"));
            }
            let gaps_ms = gaps
                .members()
                .map(|gap| {
                    gap.as_u64().ok_or_else(|| {
                        invalid("gapPatternMs", "expected non-negative integers")
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            config.pattern = BlinkPattern::from_millis(&gaps_ms)?;
        }
        if doc.has_key("ledPin") {
            config.led_pin = if doc["ledPin"].is_null() {
                None
            } else {
                Some(
                    doc["ledPin"]
                        .as_u8()
                        .ok_or_else(|| invalid("ledPin", "expected a pin number or null"))?,
                )
            };
        }
        if let Some(listen) = optional(&doc, "listen") {
            config.listen = listen
                .as_str()
                .ok_or_else(|| invalid("listen", "expected a string"))?
                .to_string();
        }
        if let Some(accept) = optional(&doc, "acceptEula") {
            config.accept_eula = accept
                .as_bool()
                .ok_or_else(|| invalid("acceptEula", "expected a boolean"))?;
        }
        if let Some(level) = optional(&doc, "logLevel") {
            let level = level
                .as_str()
                .ok_or_else(|| invalid("logLevel", "expected a string"))?;
            config.log_level = level
                .parse()
                .map_err(|_| invalid("logLevel", format!("unknown level {:?}", level)))?;
        }
        Ok(config)
    }
}

fn optional<'a>(doc: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    let value = &doc[key];
    if value.is_null() {
        None
    } else {
        Some(value)
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_match_the_stock_strobe() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.on_duration, Duration::from_millis(75));
        assert_eq!(config.pattern, BlinkPattern::from_millis(&[100, 100, 400]).unwrap());
        assert_eq!(config.led_pin, Some(21));
        assert_eq!(config.listen, "0.0.0.0:8888");
        assert!(!config.accept_eula);
    }

    #[test]
    fn overrides() {
        let config = Config::parse(
            r#"{
                "onDurationMs": 50,
                "gapPatternMs": [200, 0],
                "ledPin": null,
                "listen": "127.0.0.1:9000",
                "acceptEula": true,
                "logLevel": "debug",
                "somethingElse": 1
            }"#,
        )
        .unwrap();
        assert_eq!(config.on_duration, Duration::from_millis(50));
        assert_eq!(config.pattern, BlinkPattern::from_millis(&[200, 0]).unwrap());
        assert_eq!(config.led_pin, None);
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert!(config.accept_eula);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn empty_pattern_fails_fast() {
        let err = Config::parse(r#"{ "gapPatternMs": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern(Error::InvalidPattern)));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let err = Config::parse(r#"{ "gapPatternMs": [100, -1] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "gapPatternMs", .. }));
        let err = Config::parse(r#"{ "onDurationMs": -75 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "onDurationMs", .. }));
    }

    #[test]
    fn zero_durations_keep_a_floor() {
        let config = Config::parse(r#"{ "onDurationMs": 0, "gapPatternMs": [0] }"#).unwrap();
        assert_eq!(config.on_duration, MIN_ON_DURATION);
        assert_eq!(config.pattern.period(config.on_duration), MIN_ON_DURATION);
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(Config::parse("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            Config::parse("[1, 2]"),
            Err(ConfigError::Invalid { key: "<root>", .. })
        ));
    }
}
