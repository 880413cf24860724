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

//! Rich Release Format tables
//!
//! Each table is a pipe delimited text file with a trailing `|` on every line.
//! Only the columns the concept layer reads are kept; rows are converted into
//! typed structs once and then cached as a binary snapshot next to the raw
//! file (`MRCONSO.RRF.snapshot`).

use crate::snapshot::{read_snapshot, write_snapshot};
use guidemap_core::{GuidemapError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A typed row of one RRF table
pub trait RrfRow: Sized + Serialize + DeserializeOwned {
    /// File name inside the `META` directory
    const FILE_NAME: &'static str;
    /// Number of columns in the raw table
    const COLUMNS: usize;
    /// Snapshot magic number
    const MAGIC: &'static [u8; 8];

    /// Build a row from its split fields; `fields.len() >= COLUMNS`
    fn from_fields(fields: &[&str]) -> Self;
}

/// Term row of `MRCONSO.RRF`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRow {
    pub cui: String,
    /// Language tag (LAT)
    pub language: String,
    /// Preferred string within source (ISPREF = Y)
    pub is_preferred: bool,
    /// Source vocabulary (SAB)
    pub source: String,
    /// Term type within source (TTY)
    pub term_type: String,
    /// Identifier within source (CODE)
    pub code: String,
    /// Term text (STR)
    pub text: String,
}

impl RrfRow for TermRow {
    const FILE_NAME: &'static str = "MRCONSO.RRF";
    const COLUMNS: usize = 18;
    const MAGIC: &'static [u8; 8] = b"GMCONSO1";

    fn from_fields(f: &[&str]) -> Self {
        Self {
            cui: f[0].to_string(),
            language: f[1].to_string(),
            is_preferred: f[6] == "Y",
            source: f[11].to_string(),
            term_type: f[12].to_string(),
            code: f[13].to_string(),
            text: f[14].to_string(),
        }
    }
}

/// Relation row of `MRREL.RRF`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRow {
    /// Source concept (CUI1)
    pub source_cui: String,
    /// Relation type (REL)
    pub relation: String,
    /// Target concept (CUI2)
    pub target_cui: String,
    /// Provenance vocabulary (SAB)
    pub source: String,
    /// SUPPRESS column is anything other than `N`
    pub suppressed: bool,
}

impl RrfRow for RelationRow {
    const FILE_NAME: &'static str = "MRREL.RRF";
    const COLUMNS: usize = 16;
    const MAGIC: &'static [u8; 8] = b"GMREL001";

    fn from_fields(f: &[&str]) -> Self {
        Self {
            source_cui: f[0].to_string(),
            relation: f[3].to_string(),
            target_cui: f[4].to_string(),
            source: f[10].to_string(),
            suppressed: f[14] != "N",
        }
    }
}

/// Semantic type row of `MRSTY.RRF`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticTypeRow {
    pub cui: String,
    /// TUI
    pub type_code: String,
    /// STN
    pub tree_position: String,
    /// STY
    pub name: String,
}

impl RrfRow for SemanticTypeRow {
    const FILE_NAME: &'static str = "MRSTY.RRF";
    const COLUMNS: usize = 6;
    const MAGIC: &'static [u8; 8] = b"GMSTY001";

    fn from_fields(f: &[&str]) -> Self {
        Self {
            cui: f[0].to_string(),
            type_code: f[1].to_string(),
            tree_position: f[2].to_string(),
            name: f[3].to_string(),
        }
    }
}

/// Parse every line of a raw RRF table
pub fn parse_table<R: RrfRow>(path: &Path) -> Result<Vec<R>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GuidemapError::MalformedRow {
            table: R::FILE_NAME.to_string(),
            line: index + 1,
            reason: e.to_string(),
        })?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < R::COLUMNS {
            return Err(GuidemapError::MalformedRow {
                table: R::FILE_NAME.to_string(),
                line: index + 1,
                reason: format!("expected {} columns, found {}", R::COLUMNS, fields.len()),
            });
        }
        if fields[0].is_empty() {
            return Err(GuidemapError::MalformedRow {
                table: R::FILE_NAME.to_string(),
                line: index + 1,
                reason: "empty concept identifier".to_string(),
            });
        }
        rows.push(R::from_fields(&fields));
    }

    Ok(rows)
}

/// Snapshot path belonging to a raw table path
pub fn snapshot_path(raw_path: &Path) -> PathBuf {
    let mut name = raw_path.as_os_str().to_owned();
    name.push(".snapshot");
    PathBuf::from(name)
}

/// Load a table from its snapshot, or parse the raw file
///
/// A present but invalid snapshot is an error. A missing raw file without a
/// snapshot is [`GuidemapError::MissingTable`].
pub fn load_table<R: RrfRow>(meta_dir: &Path, write_snapshots: bool) -> Result<Vec<R>> {
    let raw_path = meta_dir.join(R::FILE_NAME);
    let snapshot = snapshot_path(&raw_path);

    if snapshot.exists() {
        let rows: Vec<R> = read_snapshot(&snapshot, R::MAGIC)?;
        info!(
            "Loaded {} rows of {} from snapshot {:?}",
            rows.len(),
            R::FILE_NAME,
            snapshot
        );
        return Ok(rows);
    }

    if !raw_path.exists() {
        return Err(GuidemapError::MissingTable(raw_path));
    }

    info!("Parsing {:?}, this could take a while", raw_path);
    let rows = parse_table::<R>(&raw_path)?;
    info!("Parsed {} rows of {}", rows.len(), R::FILE_NAME);

    if write_snapshots {
        write_snapshot(&snapshot, R::MAGIC, &rows)?;
        debug!("Saved snapshot {:?}", snapshot);
    }
    Ok(rows)
}
