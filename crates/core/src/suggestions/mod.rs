pub mod evidence;
pub mod filter;
pub mod histogram;

use crate::domain::api::{HorizonOutcome, PerformanceSummaryItem, TrainingRow};
use crate::domain::maturity::MaturityStage;
use crate::format;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STRONG_MIN_RECS: u32 = 10;
pub const EARLY_MIN_RECS: u32 = 3;
pub const MIN_HORIZONS: u32 = 3;

const PREFERRED_HORIZON: u32 = 5;
const FALLBACK_HORIZONS: [u32; 3] = [3, 5, 10];

const MATURITY_WEIGHT: f64 = 0.6;
const RETURN_WEIGHT: f64 = 0.2;
const POSITIVE_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Strong,
    Early,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturitySource {
    Training,
    Proxy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedCandidate {
    #[serde(flatten)]
    pub item: PerformanceSummaryItem,
    pub suggestion_score: f64,
    pub maturity_score: f64,
    pub maturity_stage: MaturityStage,
    pub maturity_source: MaturitySource,
    pub tier: Tier,
    pub effective_score: Option<f64>,
    pub scoring_horizon: Option<u32>,
    pub what_history_line1: String,
    pub what_history_line2: String,
    pub why_this_is_shown: String,
    pub training_reasons: Vec<String>,
}

impl DerivedCandidate {
    /// Score used for ordering within the candidate's tier.
    pub fn rank_score(&self) -> f64 {
        match self.tier {
            Tier::Strong => self.suggestion_score,
            Tier::Early => self.effective_score.unwrap_or(self.suggestion_score),
        }
    }

    pub fn scoring_outcome(&self) -> Option<&HorizonOutcome> {
        self.scoring_horizon.and_then(|h| self.item.horizon(h))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidates {
    pub strong: Vec<DerivedCandidate>,
    pub early: Vec<DerivedCandidate>,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.strong.len() + self.early.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strong.is_empty() && self.early.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DerivedCandidate> {
        self.strong.iter().chain(self.early.iter())
    }

    pub fn find(&self, market_type: &str, symbol: &str, pattern_id: &str) -> Option<&DerivedCandidate> {
        let key = crate::domain::api::join_key(market_type, symbol, pattern_id);
        self.iter().find(|c| c.item.join_key() == key)
    }
}

/// Maturity estimate for items the training job has not scored yet.
pub fn maturity_proxy(recs_total: u32, horizons_covered: u32, outcomes_total: u32) -> f64 {
    let recs = f64::from(recs_total);
    let horizons = f64::from(horizons_covered);
    let outcomes = f64::from(outcomes_total);

    let proxy = (recs / 30.0 * 25.0).min(25.0)
        + (horizons / 5.0 * 25.0)
        + (outcomes / 40.0 * 50.0).min(50.0);
    proxy.clamp(0.0, 100.0)
}

/// The 5-bar horizon when present, otherwise the best of 3/5/10 by positive rate then mean
/// return. `None` when the item has none of them.
pub fn select_scoring_horizon(item: &PerformanceSummaryItem) -> Option<&HorizonOutcome> {
    if let Some(h) = item.horizon(PREFERRED_HORIZON) {
        return Some(h);
    }

    let mut best: Option<&HorizonOutcome> = None;
    for h in item
        .by_horizon
        .iter()
        .filter(|h| FALLBACK_HORIZONS.contains(&h.horizon_bars))
    {
        let better = match best {
            None => true,
            Some(b) => {
                let (hp, bp) = (h.pct_positive.unwrap_or(0.0), b.pct_positive.unwrap_or(0.0));
                hp > bp
                    || (hp == bp
                        && h.mean_realized_return.unwrap_or(0.0)
                            > b.mean_realized_return.unwrap_or(0.0))
            }
        };
        if better {
            best = Some(h);
        }
    }
    best
}

pub fn suggestion_score(maturity: f64, horizon: Option<&HorizonOutcome>) -> f64 {
    match horizon {
        Some(h) => {
            let mean = h.mean_realized_return.unwrap_or(0.0);
            let positive = h.pct_positive.unwrap_or(0.0);
            MATURITY_WEIGHT * maturity
                + RETURN_WEIGHT * (mean * 1000.0)
                + POSITIVE_WEIGHT * (positive * 100.0)
        }
        None => maturity * MATURITY_WEIGHT,
    }
}

/// `suggestion_score` discounted by how far `recs_total` is from the strong threshold.
pub fn effective_score(suggestion_score: f64, recs_total: u32) -> f64 {
    suggestion_score * (f64::from(recs_total) / f64::from(STRONG_MIN_RECS)).min(1.0)
}

pub fn tier_for(recs_total: u32) -> Option<Tier> {
    if recs_total >= STRONG_MIN_RECS {
        Some(Tier::Strong)
    } else if recs_total >= EARLY_MIN_RECS {
        Some(Tier::Early)
    } else {
        None
    }
}

/// Indexes training rows by join key. The first row wins on duplicate keys.
pub fn index_training_rows(rows: &[TrainingRow]) -> HashMap<String, &TrainingRow> {
    let mut out = HashMap::with_capacity(rows.len());
    for row in rows {
        let key = row.join_key();
        if out.contains_key(&key) {
            tracing::warn!(%key, "duplicate training row for join key; keeping the first");
            continue;
        }
        out.insert(key, row);
    }
    out
}

pub fn derive_candidate(
    item: &PerformanceSummaryItem,
    training: Option<&TrainingRow>,
) -> Option<DerivedCandidate> {
    if item.horizons_covered < MIN_HORIZONS {
        return None;
    }
    let tier = tier_for(item.recs_total)?;

    let training_score = training.and_then(|t| t.maturity_score);
    let (maturity_score, maturity_source) = match training_score {
        Some(score) => (score, MaturitySource::Training),
        None => (
            maturity_proxy(item.recs_total, item.horizons_covered, item.outcomes_total),
            MaturitySource::Proxy,
        ),
    };
    let maturity_stage = training
        .and_then(|t| t.maturity_stage)
        .unwrap_or_else(|| MaturityStage::from_score(maturity_score));

    let horizon = select_scoring_horizon(item);
    let score = suggestion_score(maturity_score, horizon);
    if !score.is_finite() {
        tracing::warn!(key = %item.join_key(), "suggestion score is not finite; skipping item");
        return None;
    }
    let effective = match tier {
        Tier::Strong => None,
        Tier::Early => Some(effective_score(score, item.recs_total)),
    };

    let (line1, line2) = history_lines(horizon);
    let why = why_shown(item, tier, maturity_stage, maturity_score, effective);

    Some(DerivedCandidate {
        item: item.clone(),
        suggestion_score: score,
        maturity_score,
        maturity_stage,
        maturity_source,
        tier,
        effective_score: effective,
        scoring_horizon: horizon.map(|h| h.horizon_bars),
        what_history_line1: line1,
        what_history_line2: line2,
        why_this_is_shown: why,
        training_reasons: training.map(|t| t.reasons.clone()).unwrap_or_default(),
    })
}

/// Runs the pipeline over a full summary fetch. Ties keep their input order.
pub fn derive_candidates(items: &[PerformanceSummaryItem], training: &[TrainingRow]) -> Candidates {
    let index = index_training_rows(training);

    let mut out = Candidates::default();
    for item in items {
        let row = index.get(&item.join_key()).copied();
        let Some(candidate) = derive_candidate(item, row) else {
            continue;
        };
        match candidate.tier {
            Tier::Strong => out.strong.push(candidate),
            Tier::Early => out.early.push(candidate),
        }
    }

    // sort_by is stable.
    out.strong
        .sort_by(|a, b| b.suggestion_score.total_cmp(&a.suggestion_score));
    out.early.sort_by(|a, b| b.rank_score().total_cmp(&a.rank_score()));

    tracing::debug!(
        items = items.len(),
        training_rows = training.len(),
        strong = out.strong.len(),
        early = out.early.len(),
        "derived suggestion candidates"
    );
    out
}

fn history_lines(horizon: Option<&HorizonOutcome>) -> (String, String) {
    let Some(h) = horizon else {
        return (
            "No outcome history at the 3, 5 or 10 bar horizons yet.".to_string(),
            "The score reflects maturity only.".to_string(),
        );
    };

    let line1 = format!(
        "Over the next {} bars, {} of {} past outcomes were positive.",
        h.horizon_bars,
        format::pct(h.pct_positive),
        format::count(h.n),
    );
    let line2 = format!(
        "Average move {} (range {} to {}).",
        format::signed_return(h.mean_realized_return),
        format::signed_return(h.min_realized_return),
        format::signed_return(h.max_realized_return),
    );
    (line1, line2)
}

fn why_shown(
    item: &PerformanceSummaryItem,
    tier: Tier,
    stage: MaturityStage,
    maturity: f64,
    effective: Option<f64>,
) -> String {
    match tier {
        Tier::Strong => format!(
            "{} recommendations with outcomes tracked across {} horizons; maturity {} ({}).",
            item.recs_total,
            item.horizons_covered,
            stage.label(),
            format::score(Some(maturity)),
        ),
        Tier::Early => format!(
            "Early signal: only {} recommendations so far, so the score is discounted to {}.",
            item.recs_total,
            format::score(effective),
        ),
    }
}
