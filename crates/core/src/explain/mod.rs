pub mod sections;

use crate::glossary::GlossaryStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct ExplainMode(Arc<AtomicBool>);

impl ExplainMode {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

impl Default for ExplainMode {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainLink {
    pub label: String,
    pub href: String,
}

/// What the drawer explains. Missing fields deserialize from the canonical default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainContext {
    pub id: String,
    pub title: String,
    pub what: String,
    pub why: String,
    pub how: String,
    pub sources: Vec<String>,
    pub fields: Vec<String>,
    pub links: Vec<ExplainLink>,
    pub last_updated: String,
}

impl Default for ExplainContext {
    fn default() -> Self {
        Self {
            id: "overview".to_string(),
            title: "Explain Center".to_string(),
            what: "Choose \"Explain this\" on any section to see what it shows.".to_string(),
            why: String::new(),
            how: String::new(),
            sources: Vec::new(),
            fields: Vec::new(),
            links: Vec::new(),
            last_updated: String::new(),
        }
    }
}

/// A partial context. Unset fields take the canonical default, not the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainContextPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub what: Option<String>,
    #[serde(default)]
    pub why: Option<String>,
    #[serde(default)]
    pub how: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub links: Option<Vec<ExplainLink>>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl ExplainContextPatch {
    pub fn into_context(self) -> ExplainContext {
        let d = ExplainContext::default();
        ExplainContext {
            id: self.id.unwrap_or(d.id),
            title: self.title.unwrap_or(d.title),
            what: self.what.unwrap_or(d.what),
            why: self.why.unwrap_or(d.why),
            how: self.how.unwrap_or(d.how),
            sources: self.sources.unwrap_or(d.sources),
            fields: self.fields.unwrap_or(d.fields),
            links: self.links.unwrap_or(d.links),
            last_updated: self.last_updated.unwrap_or(d.last_updated),
        }
    }
}

impl From<ExplainContext> for ExplainContextPatch {
    fn from(c: ExplainContext) -> Self {
        Self {
            id: Some(c.id),
            title: Some(c.title),
            what: Some(c.what),
            why: Some(c.why),
            how: Some(c.how),
            sources: Some(c.sources),
            fields: Some(c.fields),
            links: Some(c.links),
            last_updated: Some(c.last_updated),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainCenter {
    pub open: bool,
    pub context: ExplainContext,
}

impl ExplainCenter {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn set_context(&mut self, next: impl Into<ExplainContextPatch>) {
        self.context = next.into().into_context();
    }

    /// Functional form of `set_context`: the updater sees the previous context.
    pub fn update_context<F, P>(&mut self, f: F)
    where
        F: FnOnce(&ExplainContext) -> P,
        P: Into<ExplainContextPatch>,
    {
        let next = f(&self.context);
        self.set_context(next);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExplainHandle {
    inner: Arc<RwLock<ExplainCenter>>,
}

impl ExplainHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ExplainCenter> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ExplainCenter> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ExplainCenter {
        self.read().clone()
    }

    pub fn is_open(&self) -> bool {
        self.read().open
    }

    pub fn context(&self) -> ExplainContext {
        self.read().context.clone()
    }

    pub fn open(&self) {
        self.write().open();
    }

    pub fn close(&self) {
        self.write().close();
    }

    pub fn set_context(&self, next: impl Into<ExplainContextPatch>) {
        self.write().set_context(next);
    }

    pub fn update_context<F, P>(&self, f: F)
    where
        F: FnOnce(&ExplainContext) -> P,
        P: Into<ExplainContextPatch>,
    {
        self.write().update_context(f);
    }

    /// Sets `next` and opens the drawer in one write.
    pub fn activate(&self, next: impl Into<ExplainContextPatch>) {
        let mut center = self.write();
        center.set_context(next);
        center.open();
    }

    /// Binds a fixed context to a section; calling the result explains that section.
    pub fn activator(&self, context: impl Into<ExplainContextPatch>) -> impl Fn() + Send + Sync {
        let handle = self.clone();
        let context = context.into();
        move || handle.activate(context.clone())
    }

    pub fn activator_with<F, P>(&self, make: F) -> impl Fn() + Send + Sync
    where
        F: Fn() -> P + Send + Sync,
        P: Into<ExplainContextPatch>,
    {
        let handle = self.clone();
        move || handle.activate(make())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNote {
    pub key: String,
    pub short: String,
    pub long: Option<String>,
    pub calc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainDrawer {
    pub open: bool,
    pub context: ExplainContext,
    pub field_notes: Vec<FieldNote>,
}

/// Drawer contents with the context's fields resolved against the glossary. `None` when
/// explain mode is off. Unknown field keys are skipped.
pub fn drawer_view(
    handle: &ExplainHandle,
    mode: &ExplainMode,
    glossary: &GlossaryStore,
) -> Option<ExplainDrawer> {
    if !mode.is_enabled() {
        return None;
    }
    let center = handle.snapshot();
    let field_notes = center
        .context
        .fields
        .iter()
        .filter_map(|key| {
            let entry = glossary.lookup_path(key)?;
            Some(FieldNote {
                key: key.clone(),
                short: entry.short.clone(),
                long: entry.long.clone(),
                calc: entry.calc.clone(),
            })
        })
        .collect();

    Some(ExplainDrawer {
        open: center.open,
        context: center.context,
        field_notes,
    })
}
