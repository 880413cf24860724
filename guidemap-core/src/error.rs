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

//! Error types shared by all guidemap crates
//!
//! Lookup misses (unknown CUI, no preferred text, no semantic types, a
//! traversal start without outgoing edges) are never errors. They surface as
//! `None` or empty collections. Everything in this enum is either a
//! configuration mistake or a broken on-disk artifact and is reported at
//! construction time.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for guidemap operations
pub type Result<T> = std::result::Result<T, GuidemapError>;

/// Errors that can occur while loading or querying the concept layer
#[derive(Debug, Error)]
pub enum GuidemapError {
    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Traversal direction string that is neither `broad2narrow` nor `narrow2broad`
    #[error("Direction {0} is not implemented")]
    UnsupportedDirection(String),

    /// Semantic type tree prefix that is not of the form `A1.2.3` / `B1`
    #[error("Invalid semantic type tree prefix: {0:?}")]
    InvalidSemanticTypePrefix(String),

    /// Required thesaurus table is absent
    #[error("Thesaurus table not found: {}", .0.display())]
    MissingTable(PathBuf),

    /// Row in a thesaurus table could not be parsed
    #[error("Malformed row in {table} at line {line}: {reason}")]
    MalformedRow {
        table: String,
        line: usize,
        reason: String,
    },

    /// Snapshot or persistent cache failed validation
    #[error("Cache corrupted at {}: {reason}", .path.display())]
    CacheCorrupted { path: PathBuf, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuidemapError {
    /// Shorthand for a corruption error at `path`
    pub fn corrupted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        GuidemapError::CacheCorrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for GuidemapError {
    fn from(e: bincode::Error) -> Self {
        GuidemapError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for GuidemapError {
    fn from(e: serde_json::Error) -> Self {
        GuidemapError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for GuidemapError {
    fn from(e: toml::de::Error) -> Self {
        GuidemapError::Config(e.to_string())
    }
}
