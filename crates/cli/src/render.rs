use std::fmt::Write as _;

use mip_core::explain::{self, ExplainHandle, ExplainMode};
use mip_core::format;
use mip_core::glossary::GlossaryStore;
use mip_core::poll::{LiveHeader, StatusBanner};
use mip_core::suggestions::DerivedCandidate;
use mip_core::time::timestamps;
use mip_core::views::suggestions::{EvidenceView, SuggestionsView};
use mip_core::views::today::{Section, TodayView};
use mip_core::views::training::TrainingView;

/// Appends Explain Center notes to rendered views while explain mode is on.
pub struct Explainer {
    mode: ExplainMode,
    center: ExplainHandle,
    glossary: GlossaryStore,
}

impl Explainer {
    pub fn new(mode: ExplainMode, glossary: GlossaryStore) -> Self {
        Self {
            mode,
            center: ExplainHandle::new(),
            glossary,
        }
    }

    pub fn mode(&self) -> &ExplainMode {
        &self.mode
    }

    pub fn glossary(&self) -> &GlossaryStore {
        &self.glossary
    }

    /// Explains `section` and renders the drawer. Empty when explain mode is off.
    pub fn section(&self, section: &str) -> String {
        if let Some(context) = explain::sections::section_context(section) {
            self.center.activate(context);
        }
        let Some(drawer) = explain::drawer_view(&self.center, &self.mode, &self.glossary) else {
            return String::new();
        };

        let ctx = &drawer.context;
        let mut out = String::new();
        let _ = writeln!(out, "\n-- {} --", ctx.title);
        for (label, text) in [("What", &ctx.what), ("Why", &ctx.why), ("How", &ctx.how)] {
            if !text.is_empty() {
                let _ = writeln!(out, "{label}: {text}");
            }
        }
        if !ctx.sources.is_empty() {
            let _ = writeln!(out, "Sources: {}", ctx.sources.join(", "));
        }
        for note in &drawer.field_notes {
            let _ = writeln!(out, "  {}: {}", note.key, note.short);
            if let Some(calc) = &note.calc {
                let _ = writeln!(out, "    = {calc}");
            }
        }
        out
    }
}

/// Left-aligned columns sized to the widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}", w = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(headers.to_vec()));
    let _ = writeln!(
        out,
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in rows {
        let _ = writeln!(out, "{}", line(row.iter().map(String::as_str).collect()));
    }
    out
}

pub fn status(banner: &StatusBanner) -> String {
    let marker = match banner {
        StatusBanner::Ok => "OK",
        StatusBanner::Checking => "..",
        StatusBanner::Degraded { .. } => "WARN",
        StatusBanner::Down { .. } => "DOWN",
    };
    format!("[{marker}] {}", banner.headline())
}

pub fn live(header: &LiveHeader, now: chrono::DateTime<chrono::Utc>) -> String {
    let metrics = header.metrics.clone().unwrap_or_default();
    let run = metrics.last_run.unwrap_or_default();
    let brief = metrics.last_brief.unwrap_or_default();
    let outcomes = metrics.outcomes.unwrap_or_default();

    let run_age = timestamps::age_of(run.finished_at.as_deref().or(run.started_at.as_deref()), now);
    let updated = header
        .seconds_since_update
        .map(timestamps::age_label)
        .unwrap_or_else(|| format::PLACEHOLDER.to_string());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Last run: {} ({}, {})",
        format::text(run.run_id.as_deref()),
        format::text(run.status.as_deref()),
        run_age
    );
    let _ = writeln!(
        out,
        "Last brief: {} ({}, {})",
        format::text(brief.brief_id.as_deref()),
        format::text(brief.status.as_deref()),
        timestamps::age_of(brief.created_at.as_deref(), now)
    );
    let _ = writeln!(
        out,
        "Outcomes since last run: {}",
        outcomes
            .since_last_run
            .map(|n| n.to_string())
            .unwrap_or_else(|| format::PLACEHOLDER.to_string())
    );
    let _ = write!(out, "Updated {updated}");
    if let Some(err) = &header.error {
        let _ = write!(out, " (last refresh failed: {err})");
    }
    out.push('\n');
    out
}

fn candidate_rows(candidates: &[DerivedCandidate], early: bool) -> Vec<Vec<String>> {
    candidates
        .iter()
        .map(|c| {
            let mut row = vec![
                c.item.symbol.clone(),
                c.item.market_type.clone(),
                c.item.pattern_id.clone(),
                format::score(Some(c.suggestion_score)),
            ];
            if early {
                row.push(format::score(c.effective_score));
            }
            row.extend([
                c.maturity_stage.label().to_string(),
                c.item.recs_total.to_string(),
                c.what_history_line1.clone(),
            ]);
            row
        })
        .collect()
}

pub fn suggestions(view: &SuggestionsView, explainer: &Explainer) -> String {
    let mut out = String::new();
    if view.from_brief {
        let _ = writeln!(out, "Opened from today's brief.");
    }
    if !view.training_available {
        let _ = writeln!(out, "Training status unavailable; maturity is estimated.");
    }
    if let Some(msg) = &view.empty_message {
        let _ = writeln!(out, "{msg}");
        return out;
    }

    let _ = writeln!(out, "Strong ({})", view.strong.len());
    out.push_str(&table(
        &["SYMBOL", "MARKET", "PATTERN", "SCORE", "MATURITY", "RECS", "HISTORY"],
        &candidate_rows(&view.strong, false),
    ));
    out.push_str(&explainer.section(explain::sections::SUGGESTIONS_STRONG));

    let _ = writeln!(out, "\nEarly ({})", view.early.len());
    out.push_str(&table(
        &["SYMBOL", "MARKET", "PATTERN", "SCORE", "EFFECTIVE", "MATURITY", "RECS", "HISTORY"],
        &candidate_rows(&view.early, true),
    ));
    out.push_str(&explainer.section(explain::sections::SUGGESTIONS_EARLY));
    out
}

pub fn evidence(view: &EvidenceView, explainer: &Explainer) -> String {
    let c = &view.candidate;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}  score {}",
        c.item.market_type,
        c.item.symbol,
        c.item.pattern_id,
        format::score(Some(c.suggestion_score))
    );
    if let Some(o) = c.scoring_outcome() {
        let _ = writeln!(
            out,
            "Scored at {} bars: {} positive, mean {}",
            o.horizon_bars,
            format::pct(o.pct_positive),
            format::signed_return(o.mean_realized_return)
        );
    }
    let _ = writeln!(out, "{}", c.what_history_line1);
    let _ = writeln!(out, "{}", c.what_history_line2);
    let _ = writeln!(out, "{}", c.why_this_is_shown);
    for reason in &c.training_reasons {
        let _ = writeln!(out, "  - {reason}");
    }
    out.push('\n');

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            vec![
                format!("{}{}", r.horizon_bars, if r.is_scoring_horizon { "*" } else { "" }),
                r.n.clone(),
                r.mean_realized_return.clone(),
                r.pct_positive.clone(),
                r.pct_hit.clone(),
                r.min_realized_return.clone(),
                r.max_realized_return.clone(),
            ]
        })
        .collect();
    out.push_str(&table(
        &["BARS", "N", "MEAN", "POSITIVE", "HIT", "MIN", "MAX"],
        &rows,
    ));

    let dist = &view.distribution;
    let _ = writeln!(
        out,
        "\nRealized returns at {} bars (n={})",
        dist.horizon_bars, dist.sample_size
    );
    match &dist.histogram {
        Some(h) => {
            let peak = h.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
            for bin in &h.bins {
                let bar = "#".repeat(bin.count * 30 / peak);
                let _ = writeln!(
                    out,
                    "{:>9} .. {:<9} {:>4} {bar}",
                    format::signed_return(Some(bin.start)),
                    format::signed_return(Some(bin.end)),
                    bin.count
                );
            }
        }
        None => {
            let _ = writeln!(out, "No realized returns recorded for this horizon yet.");
        }
    }
    out.push_str(&explainer.section(explain::sections::SUGGESTIONS_EVIDENCE));
    out
}

fn section_text<T>(section: &Section<T>, render: impl FnOnce(&T) -> String) -> String {
    match section {
        Section::Ready { data } => render(data),
        Section::Empty { message } => format!("{message}\n"),
    }
}

pub fn today(view: &TodayView, explainer: &Explainer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status: {}", view.status_line);

    out.push_str("\nPortfolio\n");
    out.push_str(&section_text(&view.portfolio, |p| {
        format!(
            "{} ({}) {}\nEquity {}  Cash {}  Open positions {}\n",
            p.name, p.portfolio_id, p.status, p.equity, p.cash, p.open_positions
        )
    }));

    out.push_str("\nBrief\n");
    out.push_str(&section_text(&view.brief, |b| {
        let mut s = format!("{}  ({})\n{}\n", b.title, b.created_at, b.summary);
        for line in &b.body {
            s.push_str(line);
            s.push('\n');
        }
        s
    }));

    out.push_str("\nInsights\n");
    out.push_str(&section_text(&view.insights, |rows| {
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|i| {
                vec![
                    i.symbol.clone(),
                    i.pattern_id.clone(),
                    i.score.clone(),
                    i.headline.clone(),
                    i.suggestions_query.clone().unwrap_or_default(),
                ]
            })
            .collect();
        table(&["SYMBOL", "PATTERN", "SCORE", "HEADLINE", "SUGGESTIONS"], &rows)
    }));
    out.push_str(&explainer.section(explain::sections::TODAY));
    out
}

pub fn training(view: &TrainingView, explainer: &Explainer) -> String {
    let mut out = String::new();
    if let Some(msg) = &view.empty_message {
        let _ = writeln!(out, "{msg}");
        return out;
    }

    let counts: Vec<String> = view
        .stage_counts
        .iter()
        .map(|c| format!("{} {}", c.stage.label(), c.count))
        .collect();
    let _ = writeln!(out, "{}  |  Unstaged {}\n", counts.join("  "), view.unstaged);

    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            vec![
                r.market_type.clone(),
                r.symbol.clone(),
                r.pattern_id.clone(),
                r.maturity_score.clone(),
                r.maturity_stage
                    .map(|s| s.label().to_string())
                    .unwrap_or_else(|| format::PLACEHOLDER.to_string()),
                r.coverage_ratio.clone(),
                r.reasons.join("; "),
            ]
        })
        .collect();
    out.push_str(&table(
        &["MARKET", "SYMBOL", "PATTERN", "SCORE", "STAGE", "COVERAGE", "REASONS"],
        &rows,
    ));
    out.push_str(&explainer.section(explain::sections::TRAINING));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mip_core::domain::maturity::MaturityStage;
    use mip_core::views::training::build_training_view;
    use mip_core::domain::api::{HorizonOutcome, PerformanceSummaryItem, TrainingRow};
    use mip_core::suggestions::{derive_candidate, evidence};

    fn explainer(enabled: bool) -> Explainer {
        Explainer::new(ExplainMode::new(enabled), GlossaryStore::embedded().unwrap())
    }

    #[test]
    fn table_pads_columns_to_widest_cell() {
        let out = table(
            &["A", "LONG"],
            &[vec!["wide cell".to_string(), "x".to_string()]],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "A          LONG");
        assert_eq!(lines[1], "---------  ----");
        assert_eq!(lines[2], "wide cell  x");
    }

    #[test]
    fn explain_notes_follow_explain_mode() {
        let on = explainer(true);
        let text = on.section(explain::sections::TRAINING);
        assert!(text.contains("-- "));
        assert!(text.contains("What: "));

        let off = explainer(false);
        assert!(off.section(explain::sections::TRAINING).is_empty());
    }

    #[test]
    fn training_uses_placeholders_for_missing_values() {
        let rows = vec![TrainingRow {
            market_type: "STOCK".to_string(),
            symbol: "AAPL".to_string(),
            pattern_id: "p1".to_string(),
            maturity_score: None,
            maturity_stage: None,
            coverage_ratio: None,
            reasons: Vec::new(),
        }];
        let out = training(&build_training_view(&rows), &explainer(false));
        let row = out.lines().find(|l| l.starts_with("STOCK")).unwrap();
        assert_eq!(row.matches('—').count(), 3);
        assert!(out.contains(&format!("{} 0", MaturityStage::Confident.label())));
        assert!(out.contains("Unstaged 1"));
    }

    #[test]
    fn evidence_names_the_scoring_horizon() {
        let item = PerformanceSummaryItem {
            symbol: "AAPL".to_string(),
            market_type: "STOCK".to_string(),
            pattern_id: "p1".to_string(),
            recs_total: 12,
            outcomes_total: 12,
            horizons_covered: 3,
            by_horizon: vec![HorizonOutcome {
                horizon_bars: 5,
                n: Some(12),
                mean_realized_return: Some(0.02),
                pct_positive: Some(0.6),
                ..Default::default()
            }],
        };
        let candidate = derive_candidate(&item, None).unwrap();
        let view = EvidenceView {
            rows: evidence::evidence_rows(&candidate),
            distribution: evidence::distribution(5, &[], 20),
            candidate,
        };

        let out = evidence(&view, &explainer(false));
        assert!(out.contains("Scored at 5 bars: 60.0% positive, mean +2.00%"));
        assert!(out.contains("5*"));
        assert!(out.contains("No realized returns recorded"));
    }

    #[test]
    fn status_line_marks_state() {
        assert_eq!(
            status(&StatusBanner::Down {
                message: "API not reachable".to_string()
            }),
            "[DOWN] API not reachable"
        );
    }
}
