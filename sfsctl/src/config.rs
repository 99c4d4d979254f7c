// SPDX-License-Identifier: MIT

use serde::Deserialize;
use sfs::prelude::SfsMeta;
use std::fs;
use std::path::Path;

/// Volume geometry read from `sfs.toml`. Missing keys keep the defaults.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub block_size: Option<u32>,
    pub block_count: Option<u32>,
    pub inode_count: Option<u32>,
    pub direct_count: Option<u32>,
    pub max_open: Option<usize>,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        crate::log_verbose!("Loaded geometry overrides: {config:?}");
        Ok(config)
    }

    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn meta(&self) -> SfsMeta {
        let base = SfsMeta::default();
        SfsMeta::new_custom(
            self.block_size.unwrap_or(base.block_size),
            self.block_count.unwrap_or(base.block_count),
            self.inode_count.unwrap_or(base.inode_count),
            self.direct_count.unwrap_or(base.direct_count),
            self.max_open.unwrap_or(base.max_open),
        )
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.meta().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default_geometry() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.meta(), SfsMeta::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse("block_size = 512\ninode_count = 16\n").unwrap();
        let meta = config.meta();
        assert_eq!(meta.block_size, 512);
        assert_eq!(meta.inode_count, 16);
        assert_eq!(meta.block_count, SfsMeta::default().block_count);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Config::parse("block_sise = 512").is_err());
        assert!(Config::parse("block_size = 100").unwrap().validate().is_err());
    }
}
