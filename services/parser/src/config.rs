use anyhow::{Context, Result};

use crate::fields::OperationalPolicy;
use crate::header::AliasTable;
use crate::load::{InputEncoding, LoadOptions};

/// Pipeline settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub policy: OperationalPolicy,
    pub encoding: InputEncoding,
}

impl PipelineConfig {
    /// `OPERATIONAL_POLICY` (`real` | `estimated`) and `CSV_ENCODING`
    /// (`auto` | `utf-8` | `latin1`); unset means the default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let policy = match lookup("OPERATIONAL_POLICY") {
            Some(v) if !v.trim().is_empty() => v
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid OPERATIONAL_POLICY")?,
            _ => OperationalPolicy::default(),
        };
        let encoding = match lookup("CSV_ENCODING") {
            Some(v) if !v.trim().is_empty() => v
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid CSV_ENCODING")?,
            _ => InputEncoding::default(),
        };
        Ok(Self { policy, encoding })
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            encoding: self.encoding,
            policy: self.policy,
            aliases: AliasTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.policy, OperationalPolicy::RealData);
    }

    #[test]
    fn test_reads_values() {
        let cfg = PipelineConfig::from_lookup(lookup(&[
            ("OPERATIONAL_POLICY", "estimated"),
            ("CSV_ENCODING", "latin1"),
        ]))
        .unwrap();
        assert_eq!(cfg.policy, OperationalPolicy::Estimated);
        assert_eq!(cfg.load_options().encoding, InputEncoding::Latin1);
    }

    #[test]
    fn test_invalid_value_is_error() {
        let err = PipelineConfig::from_lookup(lookup(&[("OPERATIONAL_POLICY", "guess")])).unwrap_err();
        assert!(err.to_string().contains("OPERATIONAL_POLICY"));
    }
}
