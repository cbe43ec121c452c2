//! Engine options given on the command line, e.g.
//! `"Hash value 128, Threads value 1"`.

use std::fmt;
use std::str::FromStr;

use crate::error::ArtistError;

pub const DEFAULT_HASH: u32 = 32;
pub const DEFAULT_THREADS: u32 = 1;

const HASH_RANGE: std::ops::RangeInclusive<u64> = 1..=33_554_432;
const THREADS_RANGE: std::ops::RangeInclusive<u64> = 1..=1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: String,
    /// Button options carry no value.
    pub value: Option<String>,
}

impl EngineOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn to_command(&self) -> String {
        match &self.value {
            Some(v) => format!("setoption name {} value {}", self.name, v),
            None => format!("setoption name {}", self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    options: Vec<EngineOption>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.options.push(EngineOption::new(name, value.to_string()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.options.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Value of an option, matched case-insensitively by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .and_then(|o| o.value.as_deref())
    }

    pub fn hash_mb(&self) -> u32 {
        self.get("Hash").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_HASH)
    }

    pub fn threads(&self) -> u32 {
        self.get("Threads").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_THREADS)
    }

    /// Reject values that would crash or hang an engine. Nothing has been
    /// sent to the engine when this fails.
    pub fn validate(&self) -> Result<(), ArtistError> {
        for opt in &self.options {
            let Some(value) = opt.value.as_deref() else {
                continue;
            };
            let name = opt.name.to_ascii_lowercase();
            let range = match name.as_str() {
                "hash" => HASH_RANGE,
                "threads" => THREADS_RANGE,
                "multipv" => 1..=u64::MAX,
                _ => continue,
            };
            let parsed: i64 = value.trim().parse().map_err(|_| {
                ArtistError::InvalidOption(format!("{} value '{}' is not a number", opt.name, value))
            })?;
            if parsed < 0 || !range.contains(&(parsed as u64)) {
                return Err(ArtistError::InvalidOption(format!(
                    "{} value {} is outside {}..={}",
                    opt.name,
                    parsed,
                    range.start(),
                    range.end()
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for EngineOptions {
    type Err = ArtistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let option = match part.split_once(" value ") {
                Some((name, value)) => EngineOption::new(name.trim(), value.trim()),
                None => EngineOption {
                    name: part.to_string(),
                    value: None,
                },
            };
            if option.name.is_empty() {
                return Err(ArtistError::InvalidOption(format!("missing option name in '{part}'")));
            }
            options.push(option);
        }
        Ok(Self { options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_list() {
        let opts: EngineOptions = "Hash value 128, Threads value 2, Clear Hash".parse().unwrap();
        assert_eq!(opts.hash_mb(), 128);
        assert_eq!(opts.threads(), 2);
        assert_eq!(opts.get("hash"), Some("128"));

        let commands: Vec<String> = opts.iter().map(EngineOption::to_command).collect();
        assert_eq!(
            commands,
            vec![
                "setoption name Hash value 128",
                "setoption name Threads value 2",
                "setoption name Clear Hash",
            ]
        );
    }

    #[test]
    fn test_defaults_when_absent() {
        let opts = EngineOptions::new().with("SyzygyPath", "/tb");
        assert_eq!(opts.hash_mb(), DEFAULT_HASH);
        assert_eq!(opts.threads(), DEFAULT_THREADS);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        for bad in [
            "Threads value 0",
            "Threads value 1025",
            "Hash value 0",
            "Hash value 33554433",
            "MultiPV value 0",
            "Threads value many",
            "Hash value -5",
        ] {
            let opts: EngineOptions = bad.parse().unwrap();
            assert!(
                matches!(opts.validate(), Err(ArtistError::InvalidOption(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        let opts: EngineOptions = "Hash value 33554432, Threads value 1024, MultiPV value 3"
            .parse()
            .unwrap();
        assert!(opts.validate().is_ok());
    }
}
