//! Typed configuration tree and its validating loader.
//!
//! Loading runs in a fixed order: parse (format chosen by file extension),
//! null-normalization, typed deserialization, token resolution of every
//! `location`, then validation. Any failure is a configuration error and is
//! reported before anything on disk is touched.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, IoContext, Result};
use crate::tokens::TokenTable;

/// Compression level used when the config does not set one
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 3;

/// Archiver arguments used when the config leaves `args` empty
pub const DEFAULT_COMPRESSION_ARGS: &str = "-backupxxh3";

/// A named group of entries sharing one base location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Absolute, token-resolved base directory
    pub location: PathBuf,
    /// Paths relative to `location`, unique, in config order
    pub entries: Vec<String>,
}

impl Section {
    /// Local path of `entry`
    pub fn source(&self, entry: &str) -> PathBuf {
        self.location.join(entry)
    }

    /// Store path of `entry` under `sync_dir`
    pub fn store_path(&self, sync_dir: &Path, entry: &str) -> PathBuf {
        sync_dir.join(&self.name).join(entry)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// zpaq / zpaqfranz journaling archiver
    #[default]
    Fpaq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compression {
    pub algorithm: Algorithm,
    pub level: u8,
    pub args: Vec<String>,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Fpaq,
            level: DEFAULT_COMPRESSION_LEVEL,
            args: vec![DEFAULT_COMPRESSION_ARGS.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// Sync directory; must be absolute once resolved
    pub location: Option<PathBuf>,
    /// Archive name, relative to `location` unless absolute
    pub export_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub target: Target,
    pub compression: Compression,
}

/// Fully loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub settings: Settings,
    /// Sections reconciled into the sync directory
    pub sync: Vec<Section>,
    /// Sections archived by export and restored by import
    pub export: Vec<Section>,
}

impl Config {
    /// Load and validate the config file at `path`
    pub fn load(path: &Path, tokens: &TokenTable) -> Result<Self> {
        let document = read_document(path)?;
        Self::from_value(normalize(document), tokens)
    }

    /// Parse a YAML document directly
    pub fn from_yaml_str(content: &str, tokens: &TokenTable) -> Result<Self> {
        let document: Value = serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
            path: PathBuf::from("<inline>"),
            format: "YAML".into(),
            message: e.to_string(),
        })?;
        Self::from_value(normalize(document), tokens)
    }

    /// Build the typed tree from an already-normalized document
    pub fn from_value(document: Value, tokens: &TokenTable) -> Result<Self> {
        let raw: RawDocument = if is_empty(&document) {
            RawDocument::default()
        } else {
            serde_yaml::from_value(document).map_err(|e| Error::config(e.to_string()))?
        };

        let target_location = raw
            .settings
            .target
            .location
            .as_deref()
            .map(|location| resolve_location("settings.target", location, tokens))
            .transpose()?;

        let compression = Compression {
            algorithm: raw.settings.compression.algorithm.unwrap_or_default(),
            level: raw
                .settings
                .compression
                .level
                .unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            args: match raw.settings.compression.args {
                Some(args) if !args.is_empty() => args.into_vec(),
                _ => vec![DEFAULT_COMPRESSION_ARGS.to_string()],
            },
        };

        Ok(Self {
            settings: Settings {
                target: Target {
                    location: target_location,
                    export_name: raw.settings.target.export_name,
                },
                compression,
            },
            sync: build_sections("sync", raw.sync, tokens)?,
            export: build_sections("export", raw.export, tokens)?,
        })
    }

    /// Replace the configured sync directory
    pub fn with_sync_dir(mut self, sync_dir: PathBuf) -> Self {
        self.settings.target.location = Some(sync_dir);
        self
    }

    /// The validated sync directory
    pub fn sync_dir(&self) -> Result<&Path> {
        match self.settings.target.location.as_deref() {
            None => Err(Error::config("A sync directory must be specified")),
            Some(dir) if dir.as_os_str().is_empty() => {
                Err(Error::config("A sync directory must be specified"))
            }
            Some(dir) if !dir.is_absolute() => Err(Error::config(format!(
                "Sync directory must be an absolute path: {}",
                dir.display()
            ))),
            Some(dir) => Ok(dir),
        }
    }

    /// Archive path used by export and import
    pub fn export_path(&self) -> Result<PathBuf> {
        let name = self
            .settings
            .target
            .export_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::config("An export name must be specified"))?;

        let name = Path::new(name);
        if name.is_absolute() {
            return Ok(name.to_path_buf());
        }

        Ok(self.sync_dir()?.join(name))
    }
}

/// Parse `path` into a document, choosing the format by extension
pub fn read_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).at(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" | "taml" => serde_yaml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            format: "YAML".into(),
            message: e.to_string(),
        }),
        "toml" => {
            let table: toml::Table = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            })?;
            serde_yaml::to_value(table).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            })
        }
        _ => Err(Error::UnsupportedFormat { extension }),
    }
}

/// Rewrite every null node into an empty sequence, at any depth
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Null => Value::Sequence(Vec::new()),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(normalize).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        Value::Tagged(mut tagged) => {
            tagged.value = normalize(std::mem::replace(&mut tagged.value, Value::Null));
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

fn resolve_location(context: &str, raw: &str, tokens: &TokenTable) -> Result<PathBuf> {
    let resolution = tokens.resolve_lenient(raw);
    for token in &resolution.unresolved {
        log::warn!("{}: unknown token {} left unresolved", context, token);
    }
    let resolved = resolution.value;

    if resolved.is_empty() {
        return Err(Error::config(format!("{context}: location is empty")));
    }

    let path = PathBuf::from(&resolved);
    if !path.is_absolute() {
        return Err(Error::config(format!(
            "{context}: location '{raw}' does not resolve to an absolute path ('{resolved}')"
        )));
    }

    Ok(path)
}

fn build_sections(group: &str, raw: Mapping, tokens: &TokenTable) -> Result<Vec<Section>> {
    let mut sections = Vec::with_capacity(raw.len());

    for (key, value) in raw {
        let name = key
            .as_str()
            .ok_or_else(|| Error::config(format!("{group}: section names must be strings")))?
            .to_string();
        validate_section_name(group, &name)?;

        let section: RawSection = if is_empty(&value) {
            RawSection::default()
        } else {
            serde_yaml::from_value(value)
                .map_err(|e| Error::config(format!("{group}.{name}: {e}")))?
        };

        let location = section.location.ok_or_else(|| {
            Error::config(format!("{group}.{name}: a location must be specified"))
        })?;
        let location = resolve_location(&format!("{group}.{name}"), &location, tokens)?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(section.entries.len());
        for entry in section.entries {
            let entry = clean_entry(group, &name, &entry)?;
            if !seen.insert(entry.clone()) {
                return Err(Error::config(format!(
                    "{group}.{name}: entry '{entry}' is listed more than once"
                )));
            }
            entries.push(entry);
        }

        sections.push(Section {
            name,
            location,
            entries,
        });
    }

    Ok(sections)
}

fn validate_section_name(group: &str, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::config(format!(
            "{group}: '{name}' is not a valid section name"
        ))),
    }
}

fn clean_entry(group: &str, section: &str, raw: &str) -> Result<String> {
    let entry = raw.trim_end_matches('/');
    let path = Path::new(entry);

    if entry.is_empty() {
        return Err(Error::config(format!("{group}.{section}: empty entry")));
    }

    if !path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        return Err(Error::config(format!(
            "{group}.{section}: entry '{raw}' must be a relative path inside the location"
        )));
    }

    if !path.components().any(|c| matches!(c, Component::Normal(_))) {
        return Err(Error::config(format!(
            "{group}.{section}: entry '{raw}' names the location itself"
        )));
    }

    Ok(entry.to_string())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default, deserialize_with = "or_default")]
    settings: RawSettings,
    #[serde(default, deserialize_with = "or_default")]
    sync: Mapping,
    #[serde(default, deserialize_with = "or_default")]
    export: Mapping,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(default, deserialize_with = "or_default")]
    target: RawTarget,
    #[serde(default, deserialize_with = "or_default")]
    compression: RawCompression,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTarget {
    #[serde(default, deserialize_with = "optional")]
    location: Option<String>,
    #[serde(default, deserialize_with = "optional")]
    export_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCompression {
    #[serde(default, deserialize_with = "optional")]
    algorithm: Option<Algorithm>,
    #[serde(default, deserialize_with = "optional")]
    level: Option<u8>,
    #[serde(default, deserialize_with = "optional")]
    args: Option<ArgList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSection {
    #[serde(default, deserialize_with = "optional")]
    location: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    entries: Vec<String>,
}

/// `args` may be written as one shell-like string or as a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgList {
    Line(String),
    List(Vec<String>),
}

impl ArgList {
    fn is_empty(&self) -> bool {
        match self {
            Self::Line(line) => line.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::List(items) => items,
        }
    }
}

/// Absent, null and normalized-empty values all read as `None`
fn optional<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if is_empty(&value) {
        return Ok(None);
    }
    serde_yaml::from_value(value).map(Some).map_err(de::Error::custom)
}

fn or_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    optional(deserializer).map(Option::unwrap_or_default)
}
