//! Static glossary of field and metric explanations, keyed by `scope.key`.

pub mod tooltip;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const EMBEDDED_GLOSSARY: &str = include_str!("../../assets/glossary.json");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub calc: Option<String>,
}

impl GlossaryEntry {
    /// Long text, falling back to the short text when there is none.
    pub fn long_or_short(&self) -> &str {
        self.long
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.short.trim())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlossaryStore {
    scopes: HashMap<String, HashMap<String, GlossaryEntry>>,
}

impl GlossaryStore {
    /// The glossary bundled with the crate.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_json_str(EMBEDDED_GLOSSARY).context("embedded glossary is invalid")
    }

    /// Reads `path` when given, otherwise the bundled glossary.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Self::embedded();
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read glossary file {path}"))?;
        let store = Self::from_json_str(&text)
            .with_context(|| format!("glossary file {path} is invalid"))?;
        tracing::info!(%path, entries = store.len(), "loaded glossary");
        Ok(store)
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let scopes = serde_json::from_str::<HashMap<String, HashMap<String, GlossaryEntry>>>(text)
            .context("glossary must map scope -> key -> {short, long?, calc?}")?;
        Ok(Self { scopes })
    }

    pub fn lookup(&self, scope: &str, key: &str) -> Option<&GlossaryEntry> {
        self.scopes.get(scope)?.get(key)
    }

    /// Looks up a combined `scope.key` path. The scope is everything before the first dot.
    pub fn lookup_path(&self, path: &str) -> Option<&GlossaryEntry> {
        let (scope, key) = path.trim().split_once('.')?;
        self.lookup(scope, key)
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
