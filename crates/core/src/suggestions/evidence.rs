use crate::domain::api::{DistributionQuery, HorizonOutcome};
use crate::format;
use crate::suggestions::histogram::{build_histogram, Histogram};
use crate::suggestions::DerivedCandidate;
use serde::{Deserialize, Serialize};

const DEFAULT_EVIDENCE_HORIZON: u32 = 5;

/// One formatted line of the per-horizon outcome table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub horizon_bars: u32,
    pub n: String,
    pub mean_realized_return: String,
    pub pct_positive: String,
    pub pct_hit: String,
    pub min_realized_return: String,
    pub max_realized_return: String,
    pub is_scoring_horizon: bool,
}

impl EvidenceRow {
    fn from_outcome(h: &HorizonOutcome, scoring: Option<u32>) -> Self {
        Self {
            horizon_bars: h.horizon_bars,
            n: format::count(h.n),
            mean_realized_return: format::signed_return(h.mean_realized_return),
            pct_positive: format::pct(h.pct_positive),
            pct_hit: format::pct(h.pct_hit),
            min_realized_return: format::signed_return(h.min_realized_return),
            max_realized_return: format::signed_return(h.max_realized_return),
            is_scoring_horizon: scoring == Some(h.horizon_bars),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDistribution {
    pub horizon_bars: u32,
    pub sample_size: usize,
    pub histogram: Option<Histogram>,
}

pub fn evidence_rows(candidate: &DerivedCandidate) -> Vec<EvidenceRow> {
    candidate
        .item
        .by_horizon
        .iter()
        .map(|h| EvidenceRow::from_outcome(h, candidate.scoring_horizon))
        .collect()
}

/// Horizon the drawer opens on: the one the score was computed from, else 5 bars.
pub fn default_evidence_horizon(candidate: &DerivedCandidate) -> u32 {
    candidate
        .scoring_horizon
        .unwrap_or(DEFAULT_EVIDENCE_HORIZON)
}

pub fn distribution_query(
    candidate: &DerivedCandidate,
    horizon_bars: Option<u32>,
    limit: u32,
) -> DistributionQuery {
    DistributionQuery {
        market_type: candidate.item.market_type.clone(),
        symbol: candidate.item.symbol.clone(),
        pattern_id: candidate.item.pattern_id.clone(),
        horizon_bars: horizon_bars.unwrap_or_else(|| default_evidence_horizon(candidate)),
        limit,
    }
}

pub fn distribution(horizon_bars: u32, realized_returns: &[f64], bins: usize) -> EvidenceDistribution {
    EvidenceDistribution {
        horizon_bars,
        sample_size: realized_returns.len(),
        histogram: build_histogram(realized_returns, bins),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestions::derive_candidate;
    use crate::suggestions::tests::{horizon, item};

    #[test]
    fn rows_flag_the_scoring_horizon() {
        let it = item("AAPL", 12, 3, vec![horizon(3, 0.5, 0.01), horizon(5, 0.6, 0.02)]);
        let c = derive_candidate(&it, None).unwrap();
        let rows = evidence_rows(&c);
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_scoring_horizon);
        assert!(rows[1].is_scoring_horizon);
        assert_eq!(rows[1].pct_positive, "60.0%");
        assert_eq!(rows[1].pct_hit, "—");
    }

    #[test]
    fn query_defaults_to_scoring_horizon_then_five() {
        let it = item("AAPL", 12, 3, vec![horizon(10, 0.5, 0.01)]);
        let c = derive_candidate(&it, None).unwrap();
        assert_eq!(distribution_query(&c, None, 200).horizon_bars, 10);
        assert_eq!(distribution_query(&c, Some(20), 200).horizon_bars, 20);

        let it = item("AAPL", 12, 3, vec![]);
        let c = derive_candidate(&it, None).unwrap();
        let q = distribution_query(&c, None, 200);
        assert_eq!(q.horizon_bars, 5);
        assert_eq!(q.symbol, "AAPL");
        assert_eq!(q.limit, 200);
    }

    #[test]
    fn empty_distribution_has_no_histogram() {
        let d = distribution(5, &[], 20);
        assert_eq!(d.sample_size, 0);
        assert!(d.histogram.is_none());
    }
}
