use crate::domain::api::PerformanceSummaryItem;
use crate::suggestions::{Candidates, DerivedCandidate};
use serde::{Deserialize, Serialize};

/// Client-side narrowing driven by page query parameters
/// (`symbol`, `pattern_id`, `market_type`, `from=brief`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionFilter {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub market_type: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

impl SuggestionFilter {
    /// Applies the same casing rules as payload ingestion and drops blank values.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            symbol: clean(self.symbol).map(|s| s.to_ascii_uppercase()),
            pattern_id: clean(self.pattern_id),
            market_type: clean(self.market_type).map(|s| s.to_ascii_uppercase()),
            from: clean(self.from).map(|s| s.to_ascii_lowercase()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.symbol.is_some() || self.pattern_id.is_some() || self.market_type.is_some()
    }

    pub fn from_brief(&self) -> bool {
        self.from.as_deref() == Some("brief")
    }

    pub fn matches(&self, item: &PerformanceSummaryItem) -> bool {
        let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
        eq(&self.symbol, &item.symbol)
            && eq(&self.pattern_id, &item.pattern_id)
            && eq(&self.market_type, &item.market_type)
    }

    pub fn apply(&self, candidates: Candidates) -> Candidates {
        if !self.is_active() {
            return candidates;
        }
        let keep = |c: &DerivedCandidate| self.matches(&c.item);
        Candidates {
            strong: candidates.strong.into_iter().filter(keep).collect(),
            early: candidates.early.into_iter().filter(keep).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::derive_candidates;
    use crate::suggestions::tests::{horizon, item};

    #[test]
    fn normalizes_query_values() {
        let f = SuggestionFilter {
            symbol: Some(" aapl ".to_string()),
            pattern_id: Some("".to_string()),
            market_type: Some("stock".to_string()),
            from: Some("Brief".to_string()),
        }
        .normalized();
        assert_eq!(f.symbol.as_deref(), Some("AAPL"));
        assert_eq!(f.pattern_id, None);
        assert_eq!(f.market_type.as_deref(), Some("STOCK"));
        assert!(f.from_brief());
        assert!(f.is_active());
    }

    #[test]
    fn filters_both_tiers() {
        let items = vec![
            item("AAPL", 12, 5, vec![horizon(5, 0.6, 0.01)]),
            item("MSFT", 12, 5, vec![horizon(5, 0.6, 0.01)]),
            item("AAPL", 4, 5, vec![horizon(5, 0.6, 0.01)]),
        ];
        let all = derive_candidates(&items, &[]);
        assert_eq!(all.len(), 3);

        let f = SuggestionFilter {
            symbol: Some("aapl".to_string()),
            ..Default::default()
        }
        .normalized();
        let out = f.apply(all);
        assert_eq!(out.strong.len(), 1);
        assert_eq!(out.early.len(), 1);
        assert!(out.iter().all(|c| c.item.symbol == "AAPL"));
    }

    #[test]
    fn from_brief_alone_does_not_filter() {
        let items = vec![item("AAPL", 12, 5, vec![]), item("MSFT", 12, 5, vec![])];
        let f = SuggestionFilter {
            from: Some("brief".to_string()),
            ..Default::default()
        }
        .normalized();
        assert!(!f.is_active());
        assert_eq!(f.apply(derive_candidates(&items, &[])).len(), 2);
    }
}
