// Copyright 2025 Guidemap Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Guidemap configuration
//!
//! Loaded from a TOML file with four sections:
//!
//! ```toml
//! [thesaurus]
//! base_dir = "/data/umls"
//! version = "2023AA"
//! text_sources = ["MSH", "NCI", "SNOMEDCT_US"]
//!
//! [relationship_mapper]
//! relations_broad2narrow = ["RN", "CHD"]
//! relations_narrow2broad = "RB,PAR"
//! stns_narrow2broad = "None"
//!
//! [annotator]
//! cache_dir = "/var/cache/guidemap"
//!
//! [query_defaults]
//! filter_stns_interventions = ["A1.4.1", "B1.3.1"]
//! ```
//!
//! List fields accept either an array or a comma separated string. The string
//! `"None"` is read as an empty list.

use crate::concept::validate_tree_prefix;
use crate::error::{GuidemapError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `thesaurus.base_dir`
pub const ENV_THESAURUS_DIR: &str = "GUIDEMAP_THESAURUS_DIR";
/// Environment variable overriding `thesaurus.version`
pub const ENV_THESAURUS_VERSION: &str = "GUIDEMAP_THESAURUS_VERSION";
/// Environment variable overriding `annotator.cache_dir`
pub const ENV_CACHE_DIR: &str = "GUIDEMAP_CACHE_DIR";

/// Top level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GuidemapConfig {
    #[serde(default)]
    pub thesaurus: ThesaurusConfig,
    #[serde(default)]
    pub relationship_mapper: RelationshipMapperConfig,
    #[serde(default)]
    pub annotator: AnnotatorConfig,
    #[serde(default)]
    pub query_defaults: QueryDefaults,
}

/// Location and lookup policy of the vocabulary dump
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThesaurusConfig {
    /// Directory holding one sub-directory per release
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Release name, e.g. `2023AA`
    #[serde(default = "default_version")]
    pub version: String,

    /// Vocabularies used for preferred text, highest priority first
    #[serde(default = "default_text_sources", deserialize_with = "deserialize_list")]
    pub text_sources: Vec<String>,

    /// Term types that mark the preferred form within a vocabulary
    #[serde(
        default = "default_preferred_term_types",
        deserialize_with = "deserialize_list"
    )]
    pub preferred_term_types: Vec<String>,

    /// Language tag of eligible terms
    #[serde(default = "default_language")]
    pub language: String,

    /// Write binary table snapshots after parsing raw files
    #[serde(default = "default_write_snapshots")]
    pub write_snapshots: bool,

    /// Bounded cache in front of semantic type lookups
    #[serde(default = "default_semantic_type_cache_capacity")]
    pub semantic_type_cache_capacity: u64,
}

impl ThesaurusConfig {
    /// Directory containing the `*.RRF` tables
    pub fn meta_dir(&self) -> PathBuf {
        self.base_dir.join(&self.version).join("META")
    }
}

impl Default for ThesaurusConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            version: default_version(),
            text_sources: default_text_sources(),
            preferred_term_types: default_preferred_term_types(),
            language: default_language(),
            write_snapshots: default_write_snapshots(),
            semantic_type_cache_capacity: default_semantic_type_cache_capacity(),
        }
    }
}

/// Relation allow-lists per traversal direction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelationshipMapperConfig {
    #[serde(
        default = "default_relations_broad2narrow",
        deserialize_with = "deserialize_list"
    )]
    pub relations_broad2narrow: Vec<String>,

    #[serde(
        default = "default_relations_narrow2broad",
        deserialize_with = "deserialize_list"
    )]
    pub relations_narrow2broad: Vec<String>,

    #[serde(default = "default_relation_sources", deserialize_with = "deserialize_list")]
    pub sources_broad2narrow: Vec<String>,

    #[serde(default = "default_relation_sources", deserialize_with = "deserialize_list")]
    pub sources_narrow2broad: Vec<String>,

    /// Tree prefixes both endpoints of a narrow->broad edge must match.
    /// Empty means no restriction.
    #[serde(default, deserialize_with = "deserialize_list")]
    pub stns_narrow2broad: Vec<String>,

    /// Capacity of the closure memo
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: u64,
}

impl Default for RelationshipMapperConfig {
    fn default() -> Self {
        Self {
            relations_broad2narrow: default_relations_broad2narrow(),
            relations_narrow2broad: default_relations_narrow2broad(),
            sources_broad2narrow: default_relation_sources(),
            sources_narrow2broad: default_relation_sources(),
            stns_narrow2broad: Vec::new(),
            memo_capacity: default_memo_capacity(),
        }
    }
}

/// Concept annotator and its durable cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnotatorConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_concept_cache_capacity")]
    pub cache_capacity: u64,

    /// JSON file with precomputed guideline membership
    #[serde(default)]
    pub membership_path: Option<PathBuf>,
}

impl AnnotatorConfig {
    /// Snapshot file of the concept cache
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join("concepts.cache")
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_capacity: default_concept_cache_capacity(),
            membership_path: None,
        }
    }
}

/// Filter lists applied when a query leaves them unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryDefaults {
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter_stns_population: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter_stns_interventions: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub ignore_cuis_interventions: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter_stns_interventions_known: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter_stns_interventions_unknown: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter_cuis_pediatric_population: Vec<String>,
}

// Default values
fn default_base_dir() -> PathBuf {
    PathBuf::from("./umls")
}

fn default_version() -> String {
    "2023AA".to_string()
}

fn default_text_sources() -> Vec<String> {
    vec!["MSH".to_string(), "NCI".to_string(), "SNOMEDCT_US".to_string()]
}

fn default_preferred_term_types() -> Vec<String> {
    vec!["PT".to_string()]
}

fn default_language() -> String {
    "ENG".to_string()
}

fn default_write_snapshots() -> bool {
    true
}

fn default_semantic_type_cache_capacity() -> u64 {
    200_000
}

fn default_relations_broad2narrow() -> Vec<String> {
    vec!["RN".to_string(), "CHD".to_string()]
}

fn default_relations_narrow2broad() -> Vec<String> {
    vec!["RB".to_string(), "PAR".to_string()]
}

fn default_relation_sources() -> Vec<String> {
    vec!["MSH".to_string(), "NCI".to_string()]
}

fn default_memo_capacity() -> u64 {
    1_000_000
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./guidemap-cache")
}

fn default_concept_cache_capacity() -> u64 {
    200_000
}

/// Split a comma separated config value. `"None"` is the empty list.
pub fn parse_config_list(value: &str) -> Vec<String> {
    let value = value.trim();
    if value == "None" || value.is_empty() {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn deserialize_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrString {
        List(Vec<String>),
        Text(String),
    }

    Ok(match ListOrString::deserialize(deserializer)? {
        ListOrString::List(items) => items,
        ListOrString::Text(text) => parse_config_list(&text),
    })
}

impl GuidemapConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuidemapError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration with priority: env > file > defaults, then validate
    ///
    /// Supported environment variables:
    /// - GUIDEMAP_THESAURUS_DIR: thesaurus base directory
    /// - GUIDEMAP_THESAURUS_VERSION: thesaurus release name
    /// - GUIDEMAP_CACHE_DIR: concept cache directory
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment lookups
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_THESAURUS_DIR) {
            self.thesaurus.base_dir = PathBuf::from(dir);
        }
        if let Some(version) = lookup(ENV_THESAURUS_VERSION) {
            self.thesaurus.version = version;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.annotator.cache_dir = PathBuf::from(dir);
        }
    }

    /// Reject configurations that can only fail later
    pub fn validate(&self) -> Result<()> {
        if self.thesaurus.text_sources.is_empty() {
            return Err(GuidemapError::Config(
                "thesaurus.text_sources must name at least one vocabulary".to_string(),
            ));
        }
        if self.thesaurus.semantic_type_cache_capacity == 0 {
            return Err(GuidemapError::Config(
                "thesaurus.semantic_type_cache_capacity must be positive".to_string(),
            ));
        }

        let mapper = &self.relationship_mapper;
        if mapper.relations_broad2narrow.is_empty() || mapper.relations_narrow2broad.is_empty() {
            return Err(GuidemapError::Config(
                "relationship_mapper needs relation types for both directions".to_string(),
            ));
        }
        if mapper.memo_capacity == 0 {
            return Err(GuidemapError::Config(
                "relationship_mapper.memo_capacity must be positive".to_string(),
            ));
        }
        if self.annotator.cache_capacity == 0 {
            return Err(GuidemapError::Config(
                "annotator.cache_capacity must be positive".to_string(),
            ));
        }

        let defaults = &self.query_defaults;
        mapper
            .stns_narrow2broad
            .iter()
            .chain(&defaults.filter_stns_population)
            .chain(&defaults.filter_stns_interventions)
            .chain(&defaults.filter_stns_interventions_known)
            .chain(&defaults.filter_stns_interventions_unknown)
            .try_for_each(|prefix| validate_tree_prefix(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = GuidemapConfig::default();
        config.validate().unwrap();
        assert_eq!(config.thesaurus.preferred_term_types, vec!["PT"]);
        assert_eq!(config.thesaurus.semantic_type_cache_capacity, 200_000);
        assert!(config.relationship_mapper.stns_narrow2broad.is_empty());
    }

    #[test]
    fn test_list_fields_accept_strings_and_arrays() {
        let config = GuidemapConfig::from_toml_str(
            r#"
            [thesaurus]
            text_sources = "NCI,MSH"

            [relationship_mapper]
            relations_broad2narrow = ["RN"]
            relations_narrow2broad = "RB"
            stns_narrow2broad = "None"

            [query_defaults]
            filter_stns_interventions = "A1.4.1, B1.3.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.thesaurus.text_sources, vec!["NCI", "MSH"]);
        assert_eq!(config.relationship_mapper.relations_broad2narrow, vec!["RN"]);
        assert_eq!(config.relationship_mapper.relations_narrow2broad, vec!["RB"]);
        assert!(config.relationship_mapper.stns_narrow2broad.is_empty());
        assert_eq!(
            config.query_defaults.filter_stns_interventions,
            vec!["A1.4.1", "B1.3.1"]
        );
        // Untouched sections fall back to defaults
        assert_eq!(config.annotator.cache_capacity, 200_000);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = GuidemapConfig::default();
        config.relationship_mapper.stns_narrow2broad = vec!["A1.x".to_string()];
        assert!(matches!(
            config.validate(),
            Err(GuidemapError::InvalidSemanticTypePrefix(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_lists_and_zero_capacity() {
        let mut config = GuidemapConfig::default();
        config.thesaurus.text_sources.clear();
        assert!(config.validate().is_err());

        let mut config = GuidemapConfig::default();
        config.relationship_mapper.relations_narrow2broad.clear();
        assert!(config.validate().is_err());

        let mut config = GuidemapConfig::default();
        config.annotator.cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_THESAURUS_DIR, "/data/umls"),
            (ENV_CACHE_DIR, "/tmp/guidemap"),
        ]
        .into_iter()
        .collect();

        let mut config = GuidemapConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.thesaurus.base_dir, PathBuf::from("/data/umls"));
        assert_eq!(config.thesaurus.version, "2023AA");
        assert_eq!(
            config.thesaurus.meta_dir(),
            PathBuf::from("/data/umls/2023AA/META")
        );
        assert_eq!(
            config.annotator.cache_path(),
            PathBuf::from("/tmp/guidemap/concepts.cache")
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GuidemapConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(GuidemapError::Config(_))));
    }
}
