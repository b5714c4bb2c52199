use crate::client::{DashboardApi, FetchError};
use crate::domain::api::TrainingRow;
use crate::domain::maturity::MaturityStage;
use crate::format;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRowView {
    pub market_type: String,
    pub symbol: String,
    pub pattern_id: String,
    pub maturity_score: String,
    pub maturity_stage: Option<MaturityStage>,
    pub coverage_ratio: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: MaturityStage,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingView {
    pub rows: Vec<TrainingRowView>,
    pub stage_counts: Vec<StageCount>,
    pub unstaged: usize,
    pub empty_message: Option<String>,
}

pub async fn load_training(api: &dyn DashboardApi) -> Result<TrainingView, FetchError> {
    let rows = api.training_status().await?;
    Ok(build_training_view(&rows))
}

/// Rows ordered most mature first; rows without a score keep their order at the end.
pub fn build_training_view(rows: &[TrainingRow]) -> TrainingView {
    let mut sorted: Vec<&TrainingRow> = rows.iter().collect();
    sorted.sort_by(|a, b| match (a.maturity_score, b.maturity_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let stage_counts = MaturityStage::ALL
        .iter()
        .map(|&stage| StageCount {
            stage,
            count: rows.iter().filter(|r| r.maturity_stage == Some(stage)).count(),
        })
        .collect();
    let unstaged = rows.iter().filter(|r| r.maturity_stage.is_none()).count();

    let empty_message = rows.is_empty().then(|| {
        "The training job has not scored any pattern yet. Suggestions use estimated maturity until it does."
            .to_string()
    });

    TrainingView {
        rows: sorted.into_iter().map(row_view).collect(),
        stage_counts,
        unstaged,
        empty_message,
    }
}

fn row_view(r: &TrainingRow) -> TrainingRowView {
    TrainingRowView {
        market_type: format::text(Some(r.market_type.as_str())),
        symbol: format::text(Some(r.symbol.as_str())),
        pattern_id: format::text(Some(r.pattern_id.as_str())),
        maturity_score: format::score(r.maturity_score),
        maturity_stage: r.maturity_stage,
        coverage_ratio: format::pct(r.coverage_ratio),
        reasons: r.reasons.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, score: Option<f64>, stage: Option<MaturityStage>) -> TrainingRow {
        TrainingRow {
            market_type: "STOCK".to_string(),
            symbol: symbol.to_string(),
            pattern_id: "p1".to_string(),
            maturity_score: score,
            maturity_stage: stage,
            coverage_ratio: Some(0.5),
            reasons: Vec::new(),
        }
    }

    #[test]
    fn sorts_by_score_and_counts_stages() {
        let rows = vec![
            row("A", Some(30.0), Some(MaturityStage::WarmingUp)),
            row("B", None, None),
            row("C", Some(80.0), Some(MaturityStage::Confident)),
            row("D", Some(40.0), Some(MaturityStage::WarmingUp)),
        ];
        let view = build_training_view(&rows);

        let order: Vec<&str> = view.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["C", "D", "A", "B"]);
        assert_eq!(view.rows[3].maturity_score, "—");
        assert_eq!(view.rows[0].coverage_ratio, "50.0%");

        let warming = view
            .stage_counts
            .iter()
            .find(|c| c.stage == MaturityStage::WarmingUp)
            .unwrap();
        assert_eq!(warming.count, 2);
        assert_eq!(view.unstaged, 1);
        assert!(view.empty_message.is_none());
    }

    #[test]
    fn no_rows_is_an_empty_state() {
        let view = build_training_view(&[]);
        assert!(view.rows.is_empty());
        assert!(view.empty_message.is_some());
        assert!(view.stage_counts.iter().all(|c| c.count == 0));
    }
}
