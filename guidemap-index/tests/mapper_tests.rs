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

use guidemap_core::{GuidemapError, RelationshipMapperConfig, ThesaurusConfig};
use guidemap_index::{Direction, RelationshipMapper};
use guidemap_thesaurus::{RelationRow, SemanticTypeRow, TermRow, Thesaurus};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

fn relation(source: &str, rel: &str, target: &str) -> RelationRow {
    RelationRow {
        source_cui: source.to_string(),
        relation: rel.to_string(),
        target_cui: target.to_string(),
        source: "MSH".to_string(),
        suppressed: false,
    }
}

fn term(cui: &str, text: &str) -> TermRow {
    TermRow {
        cui: cui.to_string(),
        language: "ENG".to_string(),
        is_preferred: true,
        source: "MSH".to_string(),
        term_type: "PT".to_string(),
        code: String::new(),
        text: text.to_string(),
    }
}

fn semantic_type(cui: &str, stn: &str) -> SemanticTypeRow {
    SemanticTypeRow {
        cui: cui.to_string(),
        type_code: "T000".to_string(),
        tree_position: stn.to_string(),
        name: stn.to_string(),
    }
}

fn build(
    terms: Vec<TermRow>,
    relations: Vec<RelationRow>,
    types: Vec<SemanticTypeRow>,
    config: RelationshipMapperConfig,
) -> RelationshipMapper {
    let thesaurus = Thesaurus::from_tables(&ThesaurusConfig::default(), terms, relations, types);
    RelationshipMapper::new(Arc::new(thesaurus), config).unwrap()
}

fn broad_to_narrow(edges: &[(String, String)]) -> RelationshipMapper {
    let relations = edges.iter().map(|(s, t)| relation(s, "RN", t)).collect();
    build(vec![], relations, vec![], RelationshipMapperConfig::default())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_chain_scenario() {
    let mapper = build(
        vec![],
        vec![relation("A", "RN", "B"), relation("B", "RN", "C")],
        vec![],
        RelationshipMapperConfig::default(),
    );
    let d = Direction::BroadToNarrow;

    assert_eq!(*mapper.get_related_concepts("A", d, None, &[]), strings(&["B", "C"]));
    assert_eq!(*mapper.get_related_concepts("A", d, Some(1), &[]), strings(&["B"]));
    assert_eq!(*mapper.get_related_concepts("A", d, Some(0), &[]), strings(&["B", "C"]));
    assert!(mapper
        .get_related_concepts("A", d, None, &strings(&["B"]))
        .is_empty());
}

#[test]
fn test_directions_use_their_own_relations() {
    let mapper = build(
        vec![],
        vec![relation("A", "RN", "B"), relation("B", "RB", "A")],
        vec![],
        RelationshipMapperConfig::default(),
    );

    assert_eq!(
        *mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &[]),
        strings(&["B"])
    );
    assert!(mapper
        .get_related_concepts("A", Direction::NarrowToBroad, None, &[])
        .is_empty());
    assert_eq!(
        *mapper.get_related_concepts("B", Direction::NarrowToBroad, None, &[]),
        strings(&["A"])
    );
}

#[test]
fn test_zero_degree_start_is_empty() {
    let mapper = broad_to_narrow(&[]);
    assert!(mapper
        .get_related_concepts("C9999999", Direction::BroadToNarrow, None, &[])
        .is_empty());
}

#[test]
fn test_repeated_call_returns_memoized_result() {
    let mapper = build(
        vec![],
        vec![relation("A", "RN", "B")],
        vec![],
        RelationshipMapperConfig::default(),
    );
    let first = mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &[]);
    let second = mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &[]);
    assert!(Arc::ptr_eq(&first, &second));

    // Different stop order is a different key, same content
    let stop_ab = mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &strings(&["X", "Y"]));
    let stop_ba = mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &strings(&["Y", "X"]));
    assert_eq!(stop_ab, stop_ba);
    assert!(!Arc::ptr_eq(&stop_ab, &stop_ba));
}

#[test]
fn test_names_drop_concepts_without_text() {
    let mapper = build(
        vec![term("B", "Breast Neoplasms")],
        vec![relation("A", "RN", "B"), relation("A", "RN", "C")],
        vec![],
        RelationshipMapperConfig::default(),
    );

    let named = mapper.get_related_concepts_with_names("A", Direction::BroadToNarrow, None, &[], false);
    assert_eq!(named.len(), 1);
    assert_eq!(named["B"].as_deref(), Some("Breast Neoplasms"));

    let all = mapper.get_related_concepts_with_names("A", Direction::BroadToNarrow, None, &[], true);
    assert_eq!(all.len(), 2);
    assert_eq!(all["C"], None);
}

#[test]
fn test_narrow_to_broad_semantic_type_restriction() {
    let relations = vec![
        relation("drug", "RB", "drug class"),
        relation("drug", "RB", "body part"),
    ];
    let types = vec![
        semantic_type("drug", "A1.4.1.1"),
        semantic_type("drug class", "A1.4.1"),
        semantic_type("body part", "A1.2.3"),
    ];
    let config = RelationshipMapperConfig {
        stns_narrow2broad: strings(&["A1.4"]),
        ..Default::default()
    };
    let mapper = build(vec![], relations, types, config);

    assert_eq!(
        *mapper.get_related_concepts("drug", Direction::NarrowToBroad, None, &[]),
        strings(&["drug class"])
    );
}

#[test]
fn test_stop_cut_vertex_hides_everything_behind_it() {
    let edges: Vec<(String, String)> = [("A", "B"), ("B", "C"), ("C", "D"), ("A", "E")]
        .iter()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect();
    let mapper = broad_to_narrow(&edges);

    let related = mapper.get_related_concepts("A", Direction::BroadToNarrow, None, &strings(&["B"]));
    assert_eq!(*related, strings(&["E"]));
}

#[test]
fn test_unsupported_direction_string() {
    let result = "up".parse::<Direction>();
    assert!(matches!(result, Err(GuidemapError::UnsupportedDirection(_))));
}

/// Random edges over a small node set; `acyclic` keeps only low -> high edges
fn edges_strategy(acyclic: bool) -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((0u8..12, 0u8..12), 0..40).prop_map(move |pairs| {
        pairs
            .into_iter()
            .filter(|(s, t)| !acyclic || s < t)
            .map(|(s, t)| (format!("N{s}"), format!("N{t}")))
            .collect()
    })
}

fn reachable(edges: &[(String, String)], start: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![start.to_string()];
    while let Some(node) = stack.pop() {
        for (s, t) in edges {
            if *s == node && seen.insert(t.clone()) {
                stack.push(t.clone());
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn prop_closure_matches_reachability(edges in edges_strategy(false), start in 0u8..12) {
        let mapper = broad_to_narrow(&edges);
        let start = format!("N{start}");

        let first = mapper.get_related_concepts(&start, Direction::BroadToNarrow, None, &[]);
        let second = mapper.get_related_concepts(&start, Direction::BroadToNarrow, None, &[]);
        prop_assert!(Arc::ptr_eq(&first, &second));

        let expected: Vec<String> = reachable(&edges, &start).into_iter().collect();
        prop_assert_eq!(&*first, &expected);
    }

    #[test]
    fn prop_depth_monotonic(edges in edges_strategy(false), start in 0u8..12, depth in 1usize..6) {
        let mapper = broad_to_narrow(&edges);
        let start = format!("N{start}");

        let shallow: HashSet<String> = mapper
            .get_related_concepts(&start, Direction::BroadToNarrow, Some(depth), &[])
            .iter()
            .cloned()
            .collect();
        let deeper = mapper.get_related_concepts(&start, Direction::BroadToNarrow, Some(depth + 1), &[]);
        prop_assert!(shallow.iter().all(|cui| deeper.contains(cui)));
    }

    #[test]
    fn prop_stop_set_never_returned(
        edges in edges_strategy(false),
        start in 0u8..12,
        stop in prop::collection::vec(0u8..12, 0..4),
    ) {
        let mapper = broad_to_narrow(&edges);
        let start = format!("N{start}");
        let stop: Vec<String> = stop.into_iter().map(|n| format!("N{n}")).collect();

        let related = mapper.get_related_concepts(&start, Direction::BroadToNarrow, None, &stop);
        prop_assert!(stop.iter().all(|cui| !related.contains(cui)));
    }

    #[test]
    fn prop_acyclic_start_never_included(edges in edges_strategy(true), start in 0u8..12) {
        let mapper = broad_to_narrow(&edges);
        let start = format!("N{start}");

        let related = mapper.get_related_concepts(&start, Direction::BroadToNarrow, None, &[]);
        prop_assert!(!related.contains(&start));
    }
}
