use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::TaxkitError;
use crate::taxonomy::filter::RankFilterConfig;
use crate::taxonomy::synthesis::{default_rank_names, DEFAULT_ACCESSION_PATTERN, DEFAULT_MAX_PROBES};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding nodes.dmp, names.dmp, merged.dmp and delnodes.dmp
    pub data_dir: Option<PathBuf>,
    /// Rank order file (defaults to <data_dir>/ranks.txt)
    pub rank_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub black_list: Vec<String>,
    #[serde(default)]
    pub discard_unordered: bool,
    #[serde(default)]
    pub save_predictable_unordered: bool,
    #[serde(default)]
    pub discard_root: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_rank_names")]
    pub rank_names: Vec<String>,
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
    #[serde(default = "default_max_probes")]
    pub max_probes: u32,
    #[serde(default = "default_accession_pattern")]
    pub accession_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Worker threads (0 = all cores)
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_null_values() -> Vec<String> {
    vec!["".to_string(), "NULL".to_string(), "NA".to_string()]
}

fn default_max_probes() -> u32 {
    DEFAULT_MAX_PROBES
}

fn default_accession_pattern() -> String {
    DEFAULT_ACCESSION_PATTERN.to_string()
}

fn default_batch_size() -> usize {
    4096
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            rank_names: default_rank_names(),
            null_values: default_null_values(),
            max_probes: default_max_probes(),
            accession_pattern: default_accession_pattern(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: default_batch_size(),
        }
    }
}

impl FilterConfig {
    /// Filter settings from the file, without rank bounds
    pub fn to_rank_filter_config(&self) -> RankFilterConfig {
        RankFilterConfig {
            black_list: self.black_list.clone(),
            discard_unordered: self.discard_unordered,
            save_predictable_unordered: self.save_predictable_unordered,
            discard_root: self.discard_root,
            ..Default::default()
        }
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, TaxkitError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| TaxkitError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), TaxkitError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| TaxkitError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}
