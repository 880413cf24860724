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

//! Guidemap CLI
//!
//! Command-line access to the thesaurus, the relationship mapper and the
//! concept annotator. All output is JSON on stdout.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use guidemap_annotator::{ConceptAnnotator, ConceptCache, GuidelineMembership};
use guidemap_core::{ConceptRole, EvidenceQuery, GuidemapConfig};
use guidemap_index::{Direction, RelationshipMapper};
use guidemap_thesaurus::{Normalizer, Thesaurus};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "guidemap")]
#[command(author, version, about = "Guidemap - UMLS concept mapping", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "GUIDEMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Concepts reachable from a CUI
    Related {
        cui: String,

        /// broad2narrow or narrow2broad
        #[arg(long)]
        direction: Direction,

        /// Expansion steps (unbounded if omitted)
        #[arg(long)]
        max_depth: Option<usize>,

        /// CUIs neither returned nor expanded (repeatable)
        #[arg(long = "stop")]
        stop: Vec<String>,

        /// Attach preferred text to each CUI
        #[arg(long)]
        names: bool,

        /// With --names, keep CUIs that have no text
        #[arg(long, requires = "names")]
        include_without_text: bool,

        /// Print per-step growth instead of the closure
        #[arg(long, conflicts_with_all = ["names", "stop"])]
        stats: bool,
    },

    /// Preferred text of a CUI
    Text { cui: String },

    /// Semantic types of a CUI
    SemanticTypes { cui: String },

    /// Annotate a concept mention
    Annotate {
        cui: String,

        /// population or intervention
        #[arg(long)]
        role: ConceptRole,

        /// Text found in the evidence record
        #[arg(long)]
        text: Option<String>,

        /// Guideline the query is scoped to
        #[arg(long)]
        guideline: Option<String>,

        /// Guideline membership JSON (overrides config file)
        #[arg(long)]
        membership: Option<PathBuf>,
    },

    /// Map a source vocabulary identifier to a CUI
    #[command(group(ArgGroup::new("identifier").required(true).args(["mesh", "nci", "hpo"])))]
    Normalize {
        /// MeSH term
        #[arg(long)]
        mesh: Option<String>,

        /// NCI Thesaurus code
        #[arg(long)]
        nci: Option<String>,

        /// HPO code
        #[arg(long)]
        hpo: Option<String>,
    },
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guidemap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = GuidemapConfig::load(cli.config.as_deref())?;

    let thesaurus = Arc::new(
        Thesaurus::open(&config.thesaurus).context("Failed to open thesaurus")?,
    );

    match cli.command {
        Commands::Related {
            cui,
            direction,
            max_depth,
            stop,
            names,
            include_without_text,
            stats,
        } => {
            let mapper = RelationshipMapper::new(thesaurus, config.relationship_mapper)?;
            if stats {
                let (related, steps) = mapper.trace_related_concepts(&cui, direction, max_depth);
                print_json(&json!({ "related": related, "steps": steps }))?;
            } else if names {
                let related = mapper.get_related_concepts_with_names(
                    &cui,
                    direction,
                    max_depth,
                    &stop,
                    include_without_text,
                );
                print_json(&*related)?;
            } else {
                let related = mapper.get_related_concepts(&cui, direction, max_depth, &stop);
                print_json(&*related)?;
            }
        }

        Commands::Text { cui } => {
            let text = thesaurus.get_preferred_text(&cui);
            print_json(&json!({ "cui": cui, "text": text }))?;
        }

        Commands::SemanticTypes { cui } => {
            let types = thesaurus.get_semantic_types(&cui);
            print_json(&*types)?;
        }

        Commands::Annotate {
            cui,
            role,
            text,
            guideline,
            membership,
        } => {
            let membership = match membership.or_else(|| config.annotator.membership_path.clone()) {
                Some(path) => GuidelineMembership::from_json_file(&path)
                    .with_context(|| format!("Failed to load membership {}", path.display()))?,
                None => GuidelineMembership::default(),
            };

            let cache_path = config.annotator.cache_path();
            let cache = ConceptCache::open(&cache_path, config.annotator.cache_capacity)
                .with_context(|| format!("Failed to open concept cache {}", cache_path.display()))?;
            let annotator = ConceptAnnotator::new(thesaurus, Arc::new(membership), cache);

            let query = match guideline {
                Some(id) => EvidenceQuery::for_guideline(id),
                None => EvidenceQuery::default(),
            }
            .with_defaults(&config.query_defaults);

            let concept = annotator.parse(role, &cui, text.as_deref(), &query);
            let stats = annotator.cache().stats();
            info!(
                "Concept cache: {} hits, {} misses",
                stats.hits, stats.misses
            );
            annotator.close().context("Failed to flush concept cache")?;
            print_json(&*concept)?;
        }

        Commands::Normalize { mesh, nci, hpo } => {
            let normalizer = Normalizer::from_thesaurus(&thesaurus);
            let (vocabulary, id, cui) = if let Some(term) = mesh {
                let cui = normalizer.mesh_term_to_cui(&term).map(String::from);
                ("MSH", term, cui)
            } else if let Some(code) = nci {
                let cui = normalizer.nci_to_cui(&code).map(String::from);
                ("NCI", code, cui)
            } else if let Some(code) = hpo {
                let cui = normalizer.hpo_to_cui(&code).map(String::from);
                ("HPO", code, cui)
            } else {
                anyhow::bail!("one of --mesh, --nci or --hpo is required");
            };
            print_json(&json!({ "source": vocabulary, "id": id, "cui": cui }))?;
        }
    }

    Ok(())
}
