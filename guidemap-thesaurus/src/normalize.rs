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

//! Mapping of external vocabulary identifiers to CUIs

use crate::rrf::TermRow;
use crate::store::Thesaurus;
use std::collections::HashMap;
use tracing::{debug, info};

/// Lookup tables from MeSH terms, NCI codes and HPO codes to CUIs
pub struct Normalizer {
    version: String,
    mesh_terms: HashMap<String, String>,
    nci_codes: HashMap<String, String>,
    hpo_codes: HashMap<String, String>,
}

impl Normalizer {
    pub fn from_thesaurus(thesaurus: &Thesaurus) -> Self {
        let terms = thesaurus.terms();
        let normalizer = Self {
            version: thesaurus.version().to_string(),
            mesh_terms: build_mesh_terms(terms),
            nci_codes: build_nci_codes(terms),
            hpo_codes: build_hpo_codes(terms),
        };
        info!(
            "Built normalizer: {} MeSH terms, {} NCI codes, {} HPO codes",
            normalizer.mesh_terms.len(),
            normalizer.nci_codes.len(),
            normalizer.hpo_codes.len()
        );
        normalizer
    }

    /// CUI of a MeSH term, matched case-insensitively
    pub fn mesh_term_to_cui(&self, mesh_term: &str) -> Option<&str> {
        let cui = self.mesh_terms.get(&mesh_term.to_lowercase());
        if cui.is_none() {
            debug!("MeSH term {} not found in {}", mesh_term, self.version);
        }
        cui.map(String::as_str)
    }

    pub fn nci_to_cui(&self, nci_code: &str) -> Option<&str> {
        let cui = self.nci_codes.get(nci_code);
        if cui.is_none() {
            debug!("NCI code {} not found in {}", nci_code, self.version);
        }
        cui.map(String::as_str)
    }

    pub fn hpo_to_cui(&self, hpo_code: &str) -> Option<&str> {
        let cui = self.hpo_codes.get(hpo_code);
        if cui.is_none() {
            debug!("HPO code {} not found in {}", hpo_code, self.version);
        }
        cui.map(String::as_str)
    }
}

// Qualifier entry terms are not concept names
fn build_mesh_terms(terms: &[TermRow]) -> HashMap<String, String> {
    let mut mapping: HashMap<String, (bool, String)> = HashMap::new();
    for row in terms.iter().filter(|r| r.source == "MSH" && r.term_type != "QEV") {
        let key = row.text.to_lowercase();
        match mapping.get_mut(&key) {
            Some(entry) if !entry.0 && row.is_preferred => {
                *entry = (true, row.cui.clone());
            }
            Some(_) => {}
            None => {
                mapping.insert(key, (row.is_preferred, row.cui.clone()));
            }
        }
    }
    mapping.into_iter().map(|(term, (_, cui))| (term, cui)).collect()
}

fn build_nci_codes(terms: &[TermRow]) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for row in terms.iter().filter(|r| r.source == "NCI" && r.term_type == "PT") {
        mapping
            .entry(row.code.clone())
            .or_insert_with(|| row.cui.clone());
    }
    mapping
}

fn build_hpo_codes(terms: &[TermRow]) -> HashMap<String, String> {
    let mut rows: Vec<&TermRow> = terms.iter().filter(|r| r.source == "HPO").collect();
    rows.sort_by(|a, b| (&a.code, &a.term_type).cmp(&(&b.code, &b.term_type)));

    let mut mapping = HashMap::new();
    for row in rows {
        mapping
            .entry(row.code.clone())
            .or_insert_with(|| row.cui.clone());
    }
    mapping
}
