//! A minimal environment-style configuration reader, in the shape of the
//! teacher's `utils::config::Config`: typed accessors over a flat key-value
//! map, with malformed values collected as build errors rather than causing
//! an immediate panic (callers decide whether a given key is fatal).

use std::{collections::HashMap, str::FromStr, time::Duration};

#[derive(Debug, Default, Clone)]
pub struct Config {
    values: HashMap<String, String>,
    errors: Vec<String>,
}

impl Config {
    /// Reads every environment variable into the config. Missing keys are
    /// simply absent; callers supply defaults via the `*_or` accessors.
    pub fn from_env() -> Self {
        Config {
            values: std::env::vars().collect(),
            errors: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Config {
            values,
            errors: Vec::new(),
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn property<T: FromStr>(&mut self, key: &str) -> Option<T> {
        match self.values.get(key) {
            Some(raw) => match raw.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    self.new_build_error(key, format!("could not parse value {raw:?}"));
                    None
                }
            },
            None => None,
        }
    }

    pub fn property_or<T: FromStr>(&mut self, key: &str, default: T) -> T {
        self.property(key).unwrap_or(default)
    }

    /// Parses durations of the shape `500ms`, `30s`, `15m`, `1h`, `7d`.
    pub fn duration(&mut self, key: &str) -> Option<Duration> {
        let raw = self.values.get(key)?.clone();
        match parse_duration(&raw) {
            Some(d) => Some(d),
            None => {
                self.new_build_error(key, format!("not a valid duration: {raw:?}"));
                None
            }
        }
    }

    pub fn duration_or(&mut self, key: &str, default: Duration) -> Duration {
        self.duration(key).unwrap_or(default)
    }

    /// A percentage 0..=100.
    pub fn percent_or(&mut self, key: &str, default: u8) -> u8 {
        match self.property::<u8>(key) {
            Some(v) if v <= 100 => v,
            Some(v) => {
                self.new_build_error(key, format!("{v} is not a valid percentage"));
                default
            }
            None => default,
        }
    }

    pub fn new_build_error(&mut self, key: &str, err: impl std::fmt::Display) {
        self.errors.push(format!("{key}: {err}"));
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (num, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit())?);
    let num: u64 = num.parse().ok()?;
    let secs = match unit {
        "ms" => return Some(Duration::from_millis(num)),
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
