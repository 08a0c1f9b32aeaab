//! Runtime configuration.
//!
//! Built-in defaults are overlaid by an optional TOML file, then by
//! environment variables; the CLI applies its own flags last. The resolved
//! [`DescribeConfig`] is passed explicitly to whatever needs it.

use crate::app::render::OutputFormat;
use anyhow::{Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use aws_types::SdkConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const APPLICATION: &str = "awsdescribe";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const TARGET_REGIONS_ENV: &str = "AWS_DESCRIBE_TARGET_REGIONS";
pub const OUTPUT_FORMAT_ENV: &str = "AWS_DESCRIBE_OUTPUT_FORMAT";

pub const DEFAULT_TARGET_REGIONS: [&str; 17] = [
    "ap-south-1",
    "eu-north-1",
    "eu-west-3",
    "eu-west-2",
    "eu-west-1",
    "ap-northeast-3",
    "ap-northeast-2",
    "ap-northeast-1",
    "ca-central-1",
    "sa-east-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "eu-central-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeConfig {
    /// Region of the SDK client itself, used for global services.
    pub default_region: String,
    /// Regions a regional report fans out over.
    pub regions: Vec<String>,
    pub requests_per_second: u32,
    pub burst: u32,
    /// Capacity of the row channel between producers and the collector.
    pub channel_capacity: usize,
    /// SDK attempts per request, standard retry mode.
    pub max_attempts: u32,
    pub output: OutputFormat,
    pub profile: Option<String>,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            default_region: DEFAULT_REGION.to_string(),
            regions: DEFAULT_TARGET_REGIONS.iter().map(|r| r.to_string()).collect(),
            requests_per_second: 50,
            burst: 1,
            channel_capacity: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_attempts: 10,
            output: OutputFormat::Text,
            profile: None,
        }
    }
}

/// The TOML file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    default_region: Option<String>,
    regions: Option<Vec<String>>,
    requests_per_second: Option<u32>,
    burst: Option<u32>,
    channel_capacity: Option<usize>,
    max_attempts: Option<u32>,
    output: Option<OutputFormat>,
    profile: Option<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl DescribeConfig {
    /// `<config_dir>/config.toml` of the platform's project directories.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", APPLICATION).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, then the file (`explicit` must exist; the default path may
    /// not), then the process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        match explicit {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
                    config.merge_file(&path)?;
                }
            }
        }
        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let file: FileConfig =
            toml::from_str(&content).with_context(|| format!("cannot parse config file {}", path.display()))?;
        log_debug!("loaded config file {}", path.display());

        if let Some(default_region) = file.default_region {
            self.default_region = default_region;
        }
        if let Some(regions) = file.regions {
            self.regions = regions;
        }
        if let Some(requests_per_second) = file.requests_per_second {
            self.requests_per_second = requests_per_second;
        }
        if let Some(burst) = file.burst {
            self.burst = burst;
        }
        if let Some(channel_capacity) = file.channel_capacity {
            self.channel_capacity = channel_capacity;
        }
        if let Some(max_attempts) = file.max_attempts {
            self.max_attempts = max_attempts;
        }
        if let Some(output) = file.output {
            self.output = output;
        }
        if file.profile.is_some() {
            self.profile = file.profile;
        }
        self.validate()
    }

    /// Overlay the environment, read through `lookup`.
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(regions) = lookup(TARGET_REGIONS_ENV).map(|v| split_list(&v)) {
            if !regions.is_empty() {
                self.regions = regions;
            }
        }
        if let Some(output) = lookup(OUTPUT_FORMAT_ENV).filter(|v| !v.is_empty()) {
            self.output = output.parse().with_context(|| format!("invalid {}", OUTPUT_FORMAT_ENV))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.requests_per_second > 0, "requests_per_second must be positive");
        anyhow::ensure!(self.burst > 0, "burst must be positive");
        anyhow::ensure!(self.channel_capacity > 0, "channel_capacity must be positive");
        anyhow::ensure!(self.max_attempts > 0, "max_attempts must be positive");
        anyhow::ensure!(!self.regions.is_empty(), "at least one target region is required");
        Ok(())
    }

    /// Shared SDK configuration: standard retries with `max_attempts`, the
    /// selected profile and the default region.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.default_region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(self.max_attempts));
        if let Some(profile) = &self.profile {
            log_debug!("using aws profile {}", profile);
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}
