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

//! In-memory thesaurus store
//!
//! Holds the term, relation and semantic type tables of one vocabulary
//! release and answers the two lookups the concept layer needs: the preferred
//! English text of a concept and its semantic types.
//!
//! Semantic type rows are kept sorted by CUI and searched by bisection. A
//! bounded `moka` cache (TinyLFU admission) sits in front of the search since
//! the same CUIs are looked up across thousands of records.

use crate::rrf::{load_table, RelationRow, SemanticTypeRow, TermRow};
use guidemap_core::{Result, SemanticType, ThesaurusConfig};
use moka::sync::Cache;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Vocabulary release loaded into memory
pub struct Thesaurus {
    version: String,
    terms: Vec<TermRow>,
    relations: Vec<RelationRow>,
    /// Sorted by CUI
    semantic_types: Vec<SemanticTypeRow>,

    text_sources: Vec<String>,
    preferred_term_types: Vec<String>,
    language: String,

    /// CUI -> index into `terms` of the preferred row
    preferred_text: OnceCell<HashMap<String, usize>>,
    semantic_type_cache: Cache<String, Arc<Vec<SemanticType>>>,
}

impl Thesaurus {
    /// Load the three tables of the configured release
    ///
    /// Fails on the first missing or malformed table.
    pub fn open(config: &ThesaurusConfig) -> Result<Self> {
        let meta_dir = config.meta_dir();
        info!("Opening thesaurus {} at {:?}", config.version, meta_dir);

        let terms = load_table::<TermRow>(&meta_dir, config.write_snapshots)?;
        let relations = load_table::<RelationRow>(&meta_dir, config.write_snapshots)?;
        let semantic_types = load_table::<SemanticTypeRow>(&meta_dir, config.write_snapshots)?;

        Ok(Self::from_tables(config, terms, relations, semantic_types))
    }

    /// Build a store from already parsed rows
    pub fn from_tables(
        config: &ThesaurusConfig,
        terms: Vec<TermRow>,
        relations: Vec<RelationRow>,
        mut semantic_types: Vec<SemanticTypeRow>,
    ) -> Self {
        // Stable: rows of one CUI keep their table order
        semantic_types.sort_by(|a, b| a.cui.cmp(&b.cui));

        let semantic_type_cache = Cache::builder()
            .max_capacity(config.semantic_type_cache_capacity)
            .build();

        Self {
            version: config.version.clone(),
            terms,
            relations,
            semantic_types,
            text_sources: config.text_sources.clone(),
            preferred_term_types: config.preferred_term_types.clone(),
            language: config.language.clone(),
            preferred_text: OnceCell::new(),
            semantic_type_cache,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn terms(&self) -> &[TermRow] {
        &self.terms
    }

    pub fn relations(&self) -> &[RelationRow] {
        &self.relations
    }

    /// Best English term for `cui`, if any
    ///
    /// Ranking, first difference wins:
    /// 1. position of the row's vocabulary in `text_sources`
    /// 2. term type is one of `preferred_term_types`
    /// 3. preferred string flag
    /// 4. table order
    pub fn get_preferred_text(&self, cui: &str) -> Option<String> {
        let index = self.preferred_text.get_or_init(|| self.build_preferred_text());
        match index.get(cui) {
            Some(&row) => Some(self.terms[row].text.clone()),
            None => {
                debug!("No preferred text for {} in {}", cui, self.version);
                None
            }
        }
    }

    fn build_preferred_text(&self) -> HashMap<String, usize> {
        let priority: HashMap<&str, usize> = self
            .text_sources
            .iter()
            .enumerate()
            .map(|(rank, sab)| (sab.as_str(), rank))
            .collect();

        let mut best: HashMap<&str, ((usize, bool, bool), usize)> = HashMap::new();
        for (row_index, row) in self.terms.iter().enumerate() {
            if row.language != self.language {
                continue;
            }
            let Some(&source_rank) = priority.get(row.source.as_str()) else {
                continue;
            };
            let preferred_type = self.preferred_term_types.iter().any(|t| *t == row.term_type);
            // Lower sorts first
            let rank = (source_rank, !preferred_type, !row.is_preferred);

            best.entry(row.cui.as_str())
                .and_modify(|current| {
                    if rank < current.0 {
                        *current = (rank, row_index);
                    }
                })
                .or_insert((rank, row_index));
        }

        info!("Indexed preferred text for {} concepts", best.len());
        best.into_iter()
            .map(|(cui, (_, row_index))| (cui.to_string(), row_index))
            .collect()
    }

    /// Semantic types attached to `cui`; empty if none
    pub fn get_semantic_types(&self, cui: &str) -> Arc<Vec<SemanticType>> {
        self.semantic_type_cache
            .get_with_by_ref(cui, || Arc::new(self.lookup_semantic_types(cui)))
    }

    fn lookup_semantic_types(&self, cui: &str) -> Vec<SemanticType> {
        let start = self.semantic_types.partition_point(|row| row.cui.as_str() < cui);
        self.semantic_types[start..]
            .iter()
            .take_while(|row| row.cui == cui)
            .map(|row| SemanticType::new(&row.type_code, &row.tree_position, &row.name))
            .collect()
    }

    /// Every CUI with at least one semantic type under one of `prefixes`
    pub fn cuis_with_tree_prefix<S: AsRef<str>>(&self, prefixes: &[S]) -> HashSet<String> {
        self.semantic_types
            .iter()
            .filter(|row| {
                prefixes
                    .iter()
                    .any(|prefix| row.tree_position.starts_with(prefix.as_ref()))
            })
            .map(|row| row.cui.clone())
            .collect()
    }

    /// Entries currently held by the semantic type cache
    pub fn semantic_type_cache_size(&self) -> u64 {
        self.semantic_type_cache.run_pending_tasks();
        self.semantic_type_cache.entry_count()
    }
}
