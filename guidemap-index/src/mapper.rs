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

//! Relationship mapper
//!
//! Computes the transitive set of broader or narrower concepts of a CUI by
//! frontier expansion over a direction index:
//!
//! ```text
//! frontier = {start}, visited = {}
//! loop:
//!     reached  = targets of every frontier CUI
//!     frontier = reached - visited - stop
//!     if frontier is empty: stop
//!     visited += frontier; depth += 1
//!     if depth == max_depth: stop
//! ```
//!
//! The start CUI is only part of the result if a cycle leads back to it.
//! Direction indexes are built on first use and never change afterwards.
//! Every call is memoized on its full argument tuple, so repeated calls return
//! the same `Arc` without traversing again.

use crate::direction::Direction;
use crate::relation_index::{EdgeFilter, RelationIndex};
use guidemap_core::{validate_tree_prefix, RelationshipMapperConfig, Result};
use guidemap_thesaurus::Thesaurus;
use moka::sync::Cache;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Closure result with display text per CUI
pub type NamedConcepts = BTreeMap<String, Option<String>>;

/// Growth of the closure after one expansion step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DepthStats {
    /// Step number, starting at 1
    pub depth: usize,
    /// Distinct targets reached from the frontier
    pub referenced: usize,
    /// Targets not seen before
    pub new: usize,
    /// Result size after this step
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClosureKey {
    start: String,
    direction: Direction,
    max_depth: Option<usize>,
    /// Caller order is kept
    stop: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NamedClosureKey {
    closure: ClosureKey,
    include_without_text: bool,
}

/// Transitive closure over the relation table
pub struct RelationshipMapper {
    thesaurus: Arc<Thesaurus>,
    config: RelationshipMapperConfig,
    broad_to_narrow: OnceCell<RelationIndex>,
    narrow_to_broad: OnceCell<RelationIndex>,
    closures: Cache<ClosureKey, Arc<Vec<String>>>,
    named_closures: Cache<NamedClosureKey, Arc<NamedConcepts>>,
}

impl RelationshipMapper {
    /// Create a mapper; fails on malformed narrow->broad tree prefixes
    pub fn new(thesaurus: Arc<Thesaurus>, config: RelationshipMapperConfig) -> Result<Self> {
        for prefix in &config.stns_narrow2broad {
            validate_tree_prefix(prefix)?;
        }

        let closures = Cache::builder().max_capacity(config.memo_capacity).build();
        let named_closures = Cache::builder().max_capacity(config.memo_capacity).build();

        Ok(Self {
            thesaurus,
            config,
            broad_to_narrow: OnceCell::new(),
            narrow_to_broad: OnceCell::new(),
            closures,
            named_closures,
        })
    }

    pub fn thesaurus(&self) -> &Arc<Thesaurus> {
        &self.thesaurus
    }

    /// Index for `direction`, built on first use
    pub fn index(&self, direction: Direction) -> &RelationIndex {
        match direction {
            Direction::BroadToNarrow => self
                .broad_to_narrow
                .get_or_init(|| self.build_index(direction)),
            Direction::NarrowToBroad => self
                .narrow_to_broad
                .get_or_init(|| self.build_index(direction)),
        }
    }

    fn build_index(&self, direction: Direction) -> RelationIndex {
        let rows = self.thesaurus.relations();
        let index = match direction {
            Direction::BroadToNarrow => RelationIndex::build(
                rows,
                &EdgeFilter {
                    relations: &self.config.relations_broad2narrow,
                    sources: &self.config.sources_broad2narrow,
                    restrict_to: None,
                },
            ),
            Direction::NarrowToBroad => {
                let allowed = (!self.config.stns_narrow2broad.is_empty())
                    .then(|| self.thesaurus.cuis_with_tree_prefix(&self.config.stns_narrow2broad));
                RelationIndex::build(
                    rows,
                    &EdgeFilter {
                        relations: &self.config.relations_narrow2broad,
                        sources: &self.config.sources_narrow2broad,
                        restrict_to: allowed.as_ref(),
                    },
                )
            }
        };
        info!(
            "Built {} index: {} edges from {} concepts",
            direction,
            index.edge_count(),
            index.source_count()
        );
        index
    }

    /// Every CUI reachable from `start` in `direction`
    ///
    /// `max_depth = None` expands until the closure is exhausted. The limit is
    /// checked after each step, so `Some(0)` never matches and behaves like
    /// `None`. CUIs in `stop_cuis` are neither returned nor expanded. The
    /// result is sorted.
    pub fn get_related_concepts(
        &self,
        start: &str,
        direction: Direction,
        max_depth: Option<usize>,
        stop_cuis: &[String],
    ) -> Arc<Vec<String>> {
        let key = ClosureKey {
            start: start.to_string(),
            direction,
            max_depth,
            stop: stop_cuis.to_vec(),
        };
        self.closures.get_with(key, || {
            let stop: HashSet<&str> = stop_cuis.iter().map(String::as_str).collect();
            let related = expand(self.index(direction), start, max_depth, &stop, |_| {});
            debug!(
                "{} {}: {} related concepts",
                direction,
                start,
                related.len()
            );
            Arc::new(related)
        })
    }

    /// Closure with preferred text for each reached CUI
    ///
    /// CUIs without text are dropped unless `include_without_text` is set,
    /// in which case they map to `None`.
    pub fn get_related_concepts_with_names(
        &self,
        start: &str,
        direction: Direction,
        max_depth: Option<usize>,
        stop_cuis: &[String],
        include_without_text: bool,
    ) -> Arc<NamedConcepts> {
        let key = NamedClosureKey {
            closure: ClosureKey {
                start: start.to_string(),
                direction,
                max_depth,
                stop: stop_cuis.to_vec(),
            },
            include_without_text,
        };
        self.named_closures.get_with(key, || {
            let related = self.get_related_concepts(start, direction, max_depth, stop_cuis);
            let named: NamedConcepts = related
                .iter()
                .filter_map(|cui| {
                    let text = self.thesaurus.get_preferred_text(cui);
                    (include_without_text || text.is_some()).then(|| (cui.clone(), text))
                })
                .collect();
            Arc::new(named)
        })
    }

    /// Same closure as [`get_related_concepts`](Self::get_related_concepts),
    /// without stop-set or memo, recording how it grows per step
    pub fn trace_related_concepts(
        &self,
        start: &str,
        direction: Direction,
        max_depth: Option<usize>,
    ) -> (Vec<String>, Vec<DepthStats>) {
        let mut steps = Vec::new();
        let related = expand(self.index(direction), start, max_depth, &HashSet::new(), |step| {
            steps.push(step)
        });
        (related, steps)
    }

    /// Memoized closures currently held
    pub fn memo_size(&self) -> u64 {
        self.closures.run_pending_tasks();
        self.closures.entry_count()
    }
}

/// Frontier expansion; returns the sorted closure
fn expand<'a, F>(
    index: &'a RelationIndex,
    start: &'a str,
    max_depth: Option<usize>,
    stop: &HashSet<&str>,
    mut on_step: F,
) -> Vec<String>
where
    F: FnMut(DepthStats),
{
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut frontier: Vec<&'a str> = vec![start];
    let mut reached: HashSet<&'a str> = HashSet::new();
    let mut depth = 0;

    loop {
        for cui in &frontier {
            reached.extend(index.targets(cui).iter().map(String::as_str));
        }
        let referenced = reached.len();

        frontier.clear();
        frontier.extend(
            reached
                .drain()
                .filter(|cui| !visited.contains(cui) && !stop.contains(cui)),
        );
        if frontier.is_empty() {
            on_step(DepthStats {
                depth: depth + 1,
                referenced,
                new: 0,
                total: visited.len(),
            });
            break;
        }

        visited.extend(frontier.iter().copied());
        depth += 1;
        on_step(DepthStats {
            depth,
            referenced,
            new: frontier.len(),
            total: visited.len(),
        });

        if max_depth == Some(depth) {
            break;
        }
    }

    let mut related: Vec<String> = visited.into_iter().map(String::from).collect();
    related.sort_unstable();
    related
}
