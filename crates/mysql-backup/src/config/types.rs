//! Configuration type definitions.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dump::catalog::ObjectFilter;
use crate::error::BackupError;

/// Rows per INSERT statement when not configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection parameters.
    pub connection: ConnectionConfig,

    /// Tables and views to back up (exact names or `prefix*`). Empty = all.
    #[serde(default)]
    pub tables: ObjectFilter,

    /// Backup behavior configuration.
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Database connection parameters.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Backup behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Destination folder for backup files. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,

    /// Sections to generate. Empty = all sections.
    #[serde(default)]
    pub show: SectionSelection,

    /// Rows per INSERT statement (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Character set used in CREATE DATABASE (default: utf8).
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Collation used in CREATE DATABASE (default: utf8_general_ci).
    #[serde(default = "default_collation")]
    pub collation: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            folder: None,
            show: SectionSelection::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            charset: default_charset(),
            collation: default_collation(),
        }
    }
}

impl BackupConfig {
    /// Destination folder, falling back to the system temp directory.
    pub fn output_folder(&self) -> PathBuf {
        self.folder.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// A named, independently toggleable category of dump content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// CREATE DATABASE / USE.
    Database,
    /// DROP TABLE, CREATE TABLE and deferred foreign keys.
    Tables,
    /// CREATE OR REPLACE VIEW.
    Views,
    /// Stored procedures and functions.
    Routines,
    /// TRUNCATE and INSERT data.
    Data,
}

impl Section {
    /// Canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Database => "DB",
            Section::Tables => "TABLES",
            Section::Views => "VIEWS",
            Section::Routines => "ROUTINES",
            Section::Data => "DATA",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DB" | "DATABASE" | "SCHEMA_OF_DB" => Ok(Section::Database),
            "TABLES" => Ok(Section::Tables),
            "VIEWS" => Ok(Section::Views),
            "ROUTINES" | "PROCEDURES" | "FUNCTIONS" => Ok(Section::Routines),
            "DATA" => Ok(Section::Data),
            other => Err(BackupError::Config(format!(
                "unknown backup section '{}' (expected DB, TABLES, VIEWS, ROUTINES or DATA)",
                other
            ))),
        }
    }
}

/// Set of enabled sections.
///
/// An empty selection enables every section. Use [`SectionSelection::all`]
/// to say so explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StringOrList", into = "Vec<String>")]
pub struct SectionSelection {
    sections: BTreeSet<Section>,
}

impl SectionSelection {
    /// Selection with every section enabled.
    pub fn all() -> Self {
        Self::default()
    }

    /// Selection with exactly the given sections enabled.
    pub fn only(sections: impl IntoIterator<Item = Section>) -> Self {
        Self {
            sections: sections.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list such as `"TABLES,DATA"`.
    pub fn parse(list: &str) -> Result<Self, BackupError> {
        Self::from_names(list.split(','))
    }

    fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, BackupError> {
        let sections = names
            .into_iter()
            .filter(|n| !n.trim().is_empty())
            .map(Section::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { sections })
    }

    /// Whether a section should be generated.
    pub fn is_enabled(&self, section: Section) -> bool {
        self.sections.is_empty() || self.sections.contains(&section)
    }
}

impl FromStr for SectionSelection {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<StringOrList> for SectionSelection {
    type Error = BackupError;

    fn try_from(value: StringOrList) -> Result<Self, Self::Error> {
        match value {
            StringOrList::One(list) => Self::parse(&list),
            StringOrList::Many(items) => Self::from_names(items.iter().map(String::as_str)),
        }
    }
}

impl From<SectionSelection> for Vec<String> {
    fn from(selection: SectionSelection) -> Self {
        selection
            .sections
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }
}

/// Configuration lists may be written as `"a,b"` or as a YAML sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Flatten into individual entries, splitting the string form on commas.
    pub fn into_items(self) -> Vec<String> {
        match self {
            StringOrList::One(list) => list.split(',').map(str::to_string).collect(),
            StringOrList::Many(items) => items,
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_charset() -> String {
    "utf8".to_string()
}

fn default_collation() -> String {
    "utf8_general_ci".to_string()
}
