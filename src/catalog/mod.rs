//! Project catalog: the metadata source used to enrich feed entries.
//!
//! The catalog is parsed once per run into a [`CatalogIndex`] keyed by
//! `org/repo` slug, then shared read-only with every concurrent fetch.
//!
//! - [`landscape`] - parsing and retrieval of CNCF landscape-style documents
//! - [`matcher`] - slug extraction and feed-to-project lookup

mod landscape;
mod matcher;

pub use landscape::{fetch_catalog, load_catalog_file, parse_landscape, CatalogError};
pub use matcher::{extract_slug, match_project};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Project maturity tag in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    Graduated,
    Incubating,
    Sandbox,
}

impl Maturity {
    /// Parses a catalog tag; unrecognised values (e.g. `archived`) yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "graduated" => Some(Maturity::Graduated),
            "incubating" => Some(Maturity::Incubating),
            "sandbox" => Some(Maturity::Sandbox),
            _ => None,
        }
    }
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Maturity::Graduated => "graduated",
            Maturity::Incubating => "incubating",
            Maturity::Sandbox => "sandbox",
        };
        f.write_str(s)
    }
}

/// One catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProject {
    pub name: String,
    pub description: Option<String>,
    pub repo_url: Option<String>,
    pub homepage_url: Option<String>,
    pub maturity: Option<Maturity>,
}

impl CatalogProject {
    /// True for names like `WasmEdge (Wasm)` that mark a variant listing.
    fn has_parenthetical(&self) -> bool {
        self.name.contains('(')
    }
}

/// Catalog projects keyed by `org/repo` slug.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    projects: HashMap<String, CatalogProject>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `project` under `slug`, resolving duplicate listings.
    ///
    /// Later listings replace earlier ones, except that an entry carrying a
    /// maturity tag is never replaced by one without, and between two tagged
    /// entries a plain name is never replaced by a parenthetical variant.
    /// Returns whether `project` was kept.
    pub fn insert(&mut self, slug: String, project: CatalogProject) -> bool {
        if let Some(existing) = self.projects.get(&slug) {
            let keep_existing = match (existing.maturity, project.maturity) {
                (Some(_), None) => true,
                (Some(_), Some(_)) => project.has_parenthetical() && !existing.has_parenthetical(),
                _ => false,
            };
            if keep_existing {
                tracing::debug!(
                    slug = %slug,
                    kept = %existing.name,
                    skipped = %project.name,
                    "Duplicate catalog listing ignored"
                );
                return false;
            }
        }

        self.projects.insert(slug, project);
        true
    }

    pub fn get(&self, slug: &str) -> Option<&CatalogProject> {
        self.projects.get(slug)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
