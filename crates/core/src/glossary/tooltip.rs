use crate::explain::ExplainMode;
use crate::glossary::{GlossaryEntry, GlossaryStore};
use serde::{Deserialize, Serialize};

/// Hover text longer than this is shown in a popover; native titles truncate it.
pub const POPOVER_THRESHOLD_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TooltipVariant {
    #[default]
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    Title,
    Popover,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tooltip {
    pub key: String,
    /// Inline text for the requested variant.
    pub text: String,
    /// Text shown on hover or focus.
    pub hover_text: String,
    pub calc: Option<String>,
    pub presentation: Presentation,
}

impl Tooltip {
    fn from_entry(key: &str, entry: &GlossaryEntry, variant: TooltipVariant) -> Option<Self> {
        let short = entry.short.trim();
        let long = entry.long_or_short();
        let text = match variant {
            TooltipVariant::Short => short,
            TooltipVariant::Long => long,
        };
        if text.is_empty() {
            return None;
        }

        let presentation = if long.chars().count() > POPOVER_THRESHOLD_CHARS {
            Presentation::Popover
        } else {
            Presentation::Title
        };

        Some(Self {
            key: key.to_string(),
            text: text.to_string(),
            hover_text: long.to_string(),
            calc: entry.calc.clone(),
            presentation,
        })
    }
}

/// Resolves a combined `scope.key` to tooltip content. `None` means render nothing:
/// explain mode is off, the key is unknown, or the entry has no text.
pub fn resolve_tooltip(
    mode: &ExplainMode,
    store: &GlossaryStore,
    key: &str,
    variant: TooltipVariant,
) -> Option<Tooltip> {
    if !mode.is_enabled() {
        return None;
    }
    let entry = store.lookup_path(key)?;
    Tooltip::from_entry(key.trim(), entry, variant)
}

pub fn resolve_scoped_tooltip(
    mode: &ExplainMode,
    store: &GlossaryStore,
    scope: &str,
    key: &str,
    variant: TooltipVariant,
) -> Option<Tooltip> {
    if !mode.is_enabled() {
        return None;
    }
    let entry = store.lookup(scope, key)?;
    Tooltip::from_entry(&format!("{scope}.{key}"), entry, variant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GlossaryStore {
        let long = "x".repeat(POPOVER_THRESHOLD_CHARS + 1);
        GlossaryStore::from_json_str(&format!(
            r#"{{
                "metrics": {{
                    "pct_positive": {{"short": "Share positive"}},
                    "distribution": {{"short": "Histogram", "long": "{long}"}},
                    "blank": {{"short": ""}}
                }}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn renders_nothing_when_explain_mode_is_off() {
        let mode = ExplainMode::new(false);
        let store = store();
        assert!(resolve_tooltip(&mode, &store, "metrics.pct_positive", TooltipVariant::Short).is_none());
        assert!(resolve_tooltip(&mode, &store, "metrics.nope", TooltipVariant::Long).is_none());
        assert!(resolve_scoped_tooltip(&mode, &store, "metrics", "pct_positive", TooltipVariant::Short).is_none());
    }

    #[test]
    fn unknown_keys_render_nothing() {
        let mode = ExplainMode::default();
        assert!(resolve_tooltip(&mode, &store(), "metrics.unknown", TooltipVariant::Short).is_none());
        assert!(resolve_tooltip(&mode, &store(), "metrics.blank", TooltipVariant::Short).is_none());
    }

    #[test]
    fn long_variant_falls_back_to_short() {
        let mode = ExplainMode::default();
        let t = resolve_tooltip(&mode, &store(), "metrics.pct_positive", TooltipVariant::Long).unwrap();
        assert_eq!(t.text, "Share positive");
        assert_eq!(t.presentation, Presentation::Title);
    }

    #[test]
    fn long_hover_text_uses_a_popover() {
        let mode = ExplainMode::default();
        let t = resolve_scoped_tooltip(&mode, &store(), "metrics", "distribution", TooltipVariant::Short)
            .unwrap();
        assert_eq!(t.key, "metrics.distribution");
        assert_eq!(t.text, "Histogram");
        assert_eq!(t.presentation, Presentation::Popover);
        assert_eq!(t.hover_text.len(), POPOVER_THRESHOLD_CHARS + 1);
    }
}
