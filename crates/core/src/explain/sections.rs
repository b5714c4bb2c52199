use crate::explain::{ExplainContext, ExplainLink};

pub const SUGGESTIONS_STRONG: &str = "suggestions.strong";
pub const SUGGESTIONS_EARLY: &str = "suggestions.early";
pub const SUGGESTIONS_EVIDENCE: &str = "suggestions.evidence";
pub const TODAY: &str = "today";
pub const TRAINING: &str = "training";
pub const LIVE_HEADER: &str = "live.header";
pub const STATUS_BANNER: &str = "status.banner";

pub const ALL: [&str; 7] = [
    SUGGESTIONS_STRONG,
    SUGGESTIONS_EARLY,
    SUGGESTIONS_EVIDENCE,
    TODAY,
    TRAINING,
    LIVE_HEADER,
    STATUS_BANNER,
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn link(label: &str, href: &str) -> ExplainLink {
    ExplainLink {
        label: label.to_string(),
        href: href.to_string(),
    }
}

/// Canonical explanation for a dashboard section, or `None` for an unknown id.
pub fn section_context(id: &str) -> Option<ExplainContext> {
    let ctx = match id {
        SUGGESTIONS_STRONG => ExplainContext {
            id: id.to_string(),
            title: "Strong suggestions".to_string(),
            what: "Symbol and pattern pairs with at least 10 past recommendations, ranked by suggestion score.".to_string(),
            why: "Patterns with a deep track record are the most reliable starting point for research.".to_string(),
            how: "Summary rows are joined to training maturity, scored at the 5-bar horizon (or the best of 3/5/10) and sorted by score.".to_string(),
            sources: strings(&["/performance/summary", "/training/status"]),
            fields: strings(&[
                "suggestions.suggestion_score",
                "suggestions.tier",
                "suggestions.scoring_horizon",
                "maturity.score",
                "maturity.stage",
                "metrics.pct_positive",
                "metrics.mean_realized_return",
            ]),
            links: vec![link("Training status", "/views/training")],
            ..Default::default()
        },
        SUGGESTIONS_EARLY => ExplainContext {
            id: id.to_string(),
            title: "Early suggestions".to_string(),
            what: "Pairs with 3 to 9 past recommendations, ranked by effective score.".to_string(),
            why: "Early signals are worth watching but their scores are discounted for the small sample.".to_string(),
            how: "Same scoring as strong suggestions, then multiplied by recs_total / 10.".to_string(),
            sources: strings(&["/performance/summary", "/training/status"]),
            fields: strings(&[
                "suggestions.effective_score",
                "suggestions.suggestion_score",
                "suggestions.recs_total",
                "maturity.stage",
            ]),
            ..Default::default()
        },
        SUGGESTIONS_EVIDENCE => ExplainContext {
            id: id.to_string(),
            title: "Evidence".to_string(),
            what: "Per-horizon outcome statistics and the distribution of realized returns for one candidate.".to_string(),
            why: "Averages hide dispersion; the histogram shows how outcomes are spread.".to_string(),
            how: "Realized returns for the selected horizon are split into equal-width bins between the observed minimum and maximum.".to_string(),
            sources: strings(&["/performance/summary", "/performance/distribution"]),
            fields: strings(&[
                "metrics.distribution",
                "metrics.pct_positive",
                "metrics.pct_hit",
                "metrics.mean_realized_return",
            ]),
            ..Default::default()
        },
        TODAY => ExplainContext {
            id: id.to_string(),
            title: "Today".to_string(),
            what: "The daily digest: portfolio state, the latest brief and notable insights.".to_string(),
            why: "A single place to review what the latest run produced.".to_string(),
            how: "Fetched for the configured portfolio; missing parts are shown as empty states.".to_string(),
            sources: strings(&["/today"]),
            fields: strings(&["today.portfolio", "today.brief", "today.insights"]),
            links: vec![link("Suggestions from the brief", "/views/suggestions?from=brief")],
            ..Default::default()
        },
        TRAINING => ExplainContext {
            id: id.to_string(),
            title: "Training status".to_string(),
            what: "Maturity of every tracked symbol and pattern.".to_string(),
            why: "Maturity drives how much weight a pattern gets in suggestions.".to_string(),
            how: "Rows come from the training job and are grouped by maturity stage.".to_string(),
            sources: strings(&["/training/status"]),
            fields: strings(&[
                "maturity.score",
                "maturity.stage",
                "maturity.coverage_ratio",
                "training.reasons",
            ]),
            ..Default::default()
        },
        LIVE_HEADER => ExplainContext {
            id: id.to_string(),
            title: "Live header".to_string(),
            what: "Last pipeline run, last brief and outcome activity.".to_string(),
            why: "Shows at a glance whether the pipeline is keeping up.".to_string(),
            how: "Polled every minute; the age counter ticks every second.".to_string(),
            sources: strings(&["/live/metrics"]),
            fields: strings(&[
                "live.last_run",
                "live.last_brief",
                "live.outcomes_since_last_run",
                "live.seconds_since_update",
            ]),
            ..Default::default()
        },
        STATUS_BANNER => ExplainContext {
            id: id.to_string(),
            title: "Service status".to_string(),
            what: "Reachability of the research API and its data warehouse.".to_string(),
            why: "Stale or missing data is usually explained by one of these being down.".to_string(),
            how: "Polled on a fixed interval; a failed poll shows the API as not reachable until the next success.".to_string(),
            sources: strings(&["/status"]),
            fields: strings(&["status.api", "status.warehouse"]),
            ..Default::default()
        },
        _ => return None,
    };
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glossary::GlossaryStore;

    #[test]
    fn every_section_resolves_with_known_fields() {
        let glossary = GlossaryStore::embedded().unwrap();
        for id in ALL {
            let ctx = section_context(id).unwrap();
            assert_eq!(ctx.id, id);
            assert!(!ctx.sources.is_empty(), "{id} has no sources");
            for field in &ctx.fields {
                assert!(glossary.lookup_path(field).is_some(), "{id}: unknown field {field}");
            }
        }
    }

    #[test]
    fn unknown_section_is_none() {
        assert!(section_context("settings").is_none());
    }
}
