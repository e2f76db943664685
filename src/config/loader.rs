// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::cast::{cast_value_with, ConfValue};
use crate::config::schema::{ConfKey, Requirement};
use crate::config::settings::WorkflowConfig;
use crate::errors::{ConfigError, ConfigProblem};
use crate::observability::messages::config::{ConfigFileRead, ConfigOverrideApplied};
use crate::observability::messages::StructuredLog;
use ini::{Ini, ParseOption};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration values as strings, before casting.
///
/// This is the layer the config file, the `--set` overrides and the
/// interactive form all write into. Only schema keys are stored; anything
/// else is reported as an [`ConfigProblem::UnknownKey`] on the way in.
///
/// # Example
/// ```toml
/// [GLOBAL]
/// SCIPION_ACQUISITION_PATTERN = "GRID_??/DATA/Images-Disc1/GridSquare_*/Data/*_fractions.tiff"
/// SPH_AB = 2.7
/// VOL_KV = 300
/// SAMPLING = 1.1
/// INV_CONTR = true
///
/// [PICKING]
/// PARTSIZE = 180
/// CRYOLO = true
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    values: BTreeMap<ConfKey, String>,
    source: Option<PathBuf>,
}

impl RawConfig {
    /// Build from `(name, value)` pairs. Unknown names are returned as problems
    /// and left out; a repeated name keeps its last value.
    pub fn from_entries<I>(entries: I) -> (Self, Vec<ConfigProblem>)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut raw = RawConfig::default();
        let mut problems = Vec::new();
        for (name, value) in entries {
            match ConfKey::from_name(&name) {
                Some(key) => {
                    raw.values.insert(key, value);
                }
                None => problems.push(ConfigProblem::UnknownKey { key: name }),
            }
        }
        (raw, problems)
    }

    pub fn get(&self, key: ConfKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// The configured value, or the schema default for defaulted keys.
    pub fn get_or_default(&self, key: ConfKey) -> Option<&str> {
        match (self.get(key), key.requirement()) {
            (Some(value), _) => Some(value),
            (None, Requirement::Default(default)) => Some(default),
            (None, _) => None,
        }
    }

    pub fn set(&mut self, key: ConfKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn contains(&self, key: ConfKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Apply `KEY=VALUE` overrides on top of the current values.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Vec<ConfigProblem> {
        let mut problems = Vec::new();
        for arg in overrides {
            let Some((name, value)) = arg.split_once('=') else {
                problems.push(ConfigProblem::MalformedOverride { arg: arg.clone() });
                continue;
            };
            let name = name.trim();
            match ConfKey::from_name(name) {
                Some(key) => {
                    ConfigOverrideApplied { key: name, value }.log();
                    self.values.insert(key, value.to_string());
                }
                None => problems.push(ConfigProblem::UnknownKey {
                    key: name.to_string(),
                }),
            }
        }
        problems
    }

    /// Mandatory keys that have no value yet.
    pub fn missing_mandatory(&self) -> Vec<ConfKey> {
        ConfKey::mandatory()
            .into_iter()
            .filter(|k| !self.contains(*k))
            .collect()
    }

    /// Cast every key. Configured values and defaults go through the same
    /// rules; derived keys are only present when configured.
    pub fn cast_all<F>(&self, lookup: F) -> Result<BTreeMap<ConfKey, ConfValue>, Vec<ConfigProblem>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems: Vec<ConfigProblem> = self
            .missing_mandatory()
            .into_iter()
            .map(|k| ConfigProblem::MissingMandatory {
                key: k.name().to_string(),
            })
            .collect();

        let mut cast = BTreeMap::new();
        for key in ConfKey::ALL {
            let Some(raw) = self.get_or_default(key) else {
                continue;
            };
            match cast_value_with(key, raw, &lookup) {
                Ok(value) => {
                    cast.insert(key, value);
                }
                Err(problem) => problems.push(problem),
            }
        }

        if problems.is_empty() {
            Ok(cast)
        } else {
            Err(problems)
        }
    }
}

/// On-disk syntax of a config file, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `[SECTION]` blocks of unquoted `KEY = value` lines
    Ini,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// `.toml` is TOML, `.yaml`/`.yml` is YAML, anything else is INI.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Ini,
        }
    }
}

/// Read a config file into `(name, value)` pairs.
///
/// Sections and tables are flattened so `[SECTION]` blocks only group keys.
pub fn read_config_file(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    match ConfigFormat::from_path(path) {
        ConfigFormat::Ini => {
            let options = ParseOption {
                enabled_escape: false,
                ..ParseOption::default()
            };
            let ini = Ini::load_from_str_opt(&content, options).map_err(|source| {
                ConfigError::Ini {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            flatten_ini(&ini, &mut entries);
        }
        ConfigFormat::Toml => {
            let table: toml::Table =
                toml::from_str(&content).map_err(|source| ConfigError::Toml {
                    path: path.to_path_buf(),
                    source,
                })?;
            flatten_toml(&table, &mut entries);
        }
        ConfigFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?;
            flatten_yaml(&value, &mut entries);
        }
    }
    Ok(entries)
}

// Windows paths keep their backslashes: escapes are off.
fn flatten_ini(ini: &Ini, out: &mut Vec<(String, String)>) {
    for (_section, properties) in ini.iter() {
        for (key, value) in properties.iter() {
            out.push((key.to_string(), value.to_string()));
        }
    }
}

fn flatten_toml(table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        match value {
            toml::Value::Table(inner) => flatten_toml(inner, out),
            other => out.push((key.clone(), toml_scalar(other))),
        }
    }
}

fn toml_scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(items) => items.iter().map(toml_scalar).collect::<Vec<_>>().join(","),
        toml::Value::Table(_) => String::new(),
    }
}

fn flatten_yaml(value: &serde_yaml::Value, out: &mut Vec<(String, String)>) {
    let serde_yaml::Value::Mapping(map) = value else {
        return;
    };
    for (key, value) in map {
        let key = yaml_scalar(key);
        match value {
            serde_yaml::Value::Mapping(_) => flatten_yaml(value, out),
            other => out.push((key, yaml_scalar(other))),
        }
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Sequence(items) => {
            items.iter().map(yaml_scalar).collect::<Vec<_>>().join(",")
        }
        serde_yaml::Value::Mapping(_) => String::new(),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar(&tagged.value),
    }
}

/// Read the config file (if present) and apply the overrides.
///
/// A missing file is only an error when the overrides do not supply every
/// mandatory key on their own.
pub fn load_raw<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<RawConfig, ConfigError> {
    let path = path.as_ref();
    let mut problems = Vec::new();

    let entries = if path.exists() {
        Some(read_config_file(path)?)
    } else {
        None
    };

    let read_msg = ConfigFileRead {
        path,
        key_count: entries.as_ref().map_or(0, Vec::len),
    };
    let span = read_msg.span("config_load");
    let _guard = span.enter();

    let mut raw = if let Some(entries) = entries {
        read_msg.log();
        let (mut raw, unknown) = RawConfig::from_entries(entries);
        raw.source = Some(path.to_path_buf());
        problems.extend(unknown);
        raw
    } else {
        RawConfig::default()
    };

    problems.extend(raw.apply_overrides(overrides));

    if raw.source.is_none() && !raw.missing_mandatory().is_empty() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
            mandatory: ConfKey::mandatory_names(),
        });
    }

    if problems.is_empty() {
        Ok(raw)
    } else {
        Err(ConfigError::Invalid { problems })
    }
}

/// Load, cast and derive the typed configuration.
pub fn load_config<P: AsRef<Path>>(
    path: P,
    overrides: &[String],
) -> Result<WorkflowConfig, ConfigError> {
    let raw = load_raw(path, overrides)?;
    WorkflowConfig::from_raw(&raw)
}
