//! Built-in template registry capability.
//!
//! The resolver's fallback handler consults a [`TemplateRegistry`] when a
//! bare reference matches nothing else. The registry is a capability so
//! alternative catalogs can be plugged in; [`BuiltinTemplates`] ships a
//! small embedded starter set.

use std::collections::BTreeMap;

/// Metadata describing one template in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMeta {
    /// Category grouping related templates.
    pub category: String,
    /// Lookup key, unique within the category.
    pub key: String,
    /// One-line description for listings.
    pub description: String,
}

/// Catalog of built-in rule templates.
pub trait TemplateRegistry: Send + Sync {
    /// Content of a template addressed by category and key.
    fn get(&self, category: &str, key: &str) -> Option<String>;

    /// Search every category for a key; returns `(category, content)`.
    fn find_by_name(&self, key: &str) -> Option<(String, String)>;

    /// All templates, for listings.
    fn list(&self) -> Vec<TemplateMeta>;
}

const MONOREPO_TEMPLATE: &str = "---\ndescription: Conventions for working in this monorepo\nglobs: [\"**/*\"]\n---\n\n# Monorepo conventions\n\n- Prefer changes scoped to a single package per commit.\n- Run the affected package's tests before proposing edits.\n- Shared utilities live under `packages/shared`; do not duplicate them.\n";

const PYTHON_TEMPLATE: &str = "---\ndescription: Python style and tooling expectations\nglobs: [\"**/*.py\"]\n---\n\n# Python rules\n\n- Target Python 3.11+ and use type hints on public functions.\n- Format with ruff; do not hand-align code.\n- Prefer dataclasses over ad-hoc dicts for structured data.\n";

const REACT_TEMPLATE: &str = "---\ndescription: React component conventions\nglobs: [\"**/*.tsx\"]\n---\n\n# React rules\n\n- Components are function components with hooks; no classes.\n- Co-locate styles and tests with the component.\n- Props interfaces are named `<Component>Props` and exported.\n";

const TESTING_TEMPLATE: &str = "---\ndescription: Expectations for writing and changing tests\nglobs: [\"**/*test*\"]\n---\n\n# Testing rules\n\n- Every bug fix lands with a regression test.\n- Tests must not depend on wall-clock time or network access.\n- Prefer table-driven tests for parser-style code.\n";

/// The embedded starter catalog.
#[derive(Debug, Clone)]
pub struct BuiltinTemplates {
    templates: BTreeMap<(&'static str, &'static str), (&'static str, &'static str)>,
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinTemplates {
    /// Build the catalog of embedded templates.
    #[must_use]
    pub fn new() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            ("general", "monorepo"),
            ("Conventions for monorepo work", MONOREPO_TEMPLATE),
        );
        templates.insert(
            ("languages", "python"),
            ("Python style and tooling", PYTHON_TEMPLATE),
        );
        templates.insert(
            ("frameworks", "react"),
            ("React component conventions", REACT_TEMPLATE),
        );
        templates.insert(
            ("general", "testing"),
            ("Test-writing expectations", TESTING_TEMPLATE),
        );
        Self { templates }
    }
}

impl TemplateRegistry for BuiltinTemplates {
    fn get(&self, category: &str, key: &str) -> Option<String> {
        self.templates
            .get(&(category, key))
            .map(|(_, content)| (*content).to_string())
    }

    fn find_by_name(&self, key: &str) -> Option<(String, String)> {
        self.templates
            .iter()
            .find(|((_, k), _)| *k == key)
            .map(|((category, _), (_, content))| {
                ((*category).to_string(), (*content).to_string())
            })
    }

    fn list(&self) -> Vec<TemplateMeta> {
        self.templates
            .iter()
            .map(|((category, key), (description, _))| TemplateMeta {
                category: (*category).to_string(),
                key: (*key).to_string(),
                description: (*description).to_string(),
            })
            .collect()
    }
}
