//! YAML configuration loading.
//!
//! The file is optional. When present it may carry `profiles`,
//! `exclude_dirs`, `include` globs and per-test option blocks keyed by the
//! test's `takes_config` name. Legacy profiles that list test names instead
//! of ids are converted on load; unknown strings pass through unchanged.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use tracing::warn;

use crate::core::registry::{Profile, Test};

pub const DEFAULT_INCLUDE_GLOBS: &[&str] = &["*.js"];

#[derive(Debug, Clone, Default)]
pub struct Config {
    config_file: Option<PathBuf>,
    data: serde_yaml::Value,
    profiles: HashMap<String, Profile>,
}

impl Config {
    /// Load a config file, or fall back to defaults when none is given.
    /// IO and parse failures are fatal and name the offending path.
    pub fn load(config_file: Option<&Path>, tests: &[Test]) -> Result<Config> {
        let Some(path) = config_file else {
            return Ok(Config::default());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("{} : Could not read config file.", path.display()))?;
        let data: serde_yaml::Value = serde_yaml::from_str(&content)
            .with_context(|| format!("{} : Error parsing file.", path.display()))?;
        if !data.is_mapping() {
            bail!("{} : Error parsing file.", path.display());
        }

        let profiles = convert_profiles(&data, tests, path);
        Ok(Config {
            config_file: Some(path.to_path_buf()),
            data,
            profiles,
        })
    }

    /// Look up an option by dotted path, e.g. `blacklist` or `profiles.slim`.
    pub fn get_option(&self, option: &str) -> Option<&serde_yaml::Value> {
        let mut current = &self.data;
        for level in option.split('.') {
            current = current.get(level)?;
        }
        Some(current)
    }

    /// Option converted to JSON for consumers of test config payloads.
    pub fn option_as_json(&self, option: &str) -> Option<serde_json::Value> {
        serde_json::to_value(self.get_option(option)?).ok()
    }

    pub fn profile(&self, name: &str) -> Result<Profile> {
        self.profiles.get(name).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Unable to find profile ({}) in config file: {}",
                name,
                self.config_file
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<none>".into())
            )
        })
    }

    pub fn exclude_dirs(&self) -> Vec<String> {
        self.get_option("exclude_dirs")
            .map(string_list)
            .unwrap_or_default()
    }

    pub fn include_globs(&self) -> Vec<String> {
        self.get_option("include")
            .map(string_list)
            .filter(|globs| !globs.is_empty())
            .unwrap_or_else(|| DEFAULT_INCLUDE_GLOBS.iter().map(|s| s.to_string()).collect())
    }
}

fn string_list(value: &serde_yaml::Value) -> Vec<String> {
    value
        .as_sequence()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Convert test names to ids in profile lists, leaving unknowns unchanged.
fn convert_profiles(
    data: &serde_yaml::Value,
    tests: &[Test],
    path: &Path,
) -> HashMap<String, Profile> {
    let Some(mapping) = data.get("profiles").and_then(|v| v.as_mapping()) else {
        return HashMap::new();
    };

    let ids_by_name: HashMap<&str, &str> = tests.iter().map(|test| (test.name, test.id)).collect();
    let mut converted_any = false;
    let mut convert = |value: Option<&serde_yaml::Value>| -> Vec<String> {
        value
            .map(string_list)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| match ids_by_name.get(entry.as_str()) {
                Some(id) => {
                    converted_any = true;
                    id.to_string()
                }
                None => entry,
            })
            .collect()
    };

    let mut profiles = HashMap::new();
    for (name, profile) in mapping {
        let Some(name) = name.as_str() else { continue };
        profiles.insert(
            name.to_string(),
            Profile {
                include: convert(profile.get("include")),
                exclude: convert(profile.get("exclude")),
            },
        );
    }

    if converted_any {
        warn!(
            config = %path.display(),
            "config profiles reference tests by name; names were converted to ids, \
             please switch the profile lists to test ids"
        );
    }
    profiles
}
