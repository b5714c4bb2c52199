use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaturityStage {
    Insufficient,
    WarmingUp,
    Learning,
    Confident,
}

impl MaturityStage {
    pub const ALL: [MaturityStage; 4] = [
        MaturityStage::Insufficient,
        MaturityStage::WarmingUp,
        MaturityStage::Learning,
        MaturityStage::Confident,
    ];

    /// Threshold buckets over a 0..=100 maturity score.
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            Self::Insufficient
        } else if score < 50.0 {
            Self::WarmingUp
        } else if score < 75.0 {
            Self::Learning
        } else {
            Self::Confident
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insufficient => "INSUFFICIENT",
            Self::WarmingUp => "WARMING_UP",
            Self::Learning => "LEARNING",
            Self::Confident => "CONFIDENT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Insufficient => "Insufficient",
            Self::WarmingUp => "Warming up",
            Self::Learning => "Learning",
            Self::Confident => "Confident",
        }
    }
}

impl fmt::Display for MaturityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown maturity stage: {}", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for MaturityStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "INSUFFICIENT" => Ok(Self::Insufficient),
            "WARMING_UP" => Ok(Self::WarmingUp),
            "LEARNING" => Ok(Self::Learning),
            "CONFIDENT" => Ok(Self::Confident),
            _ => Err(UnknownStage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_bucket_scores() {
        assert_eq!(MaturityStage::from_score(0.0), MaturityStage::Insufficient);
        assert_eq!(MaturityStage::from_score(24.99), MaturityStage::Insufficient);
        assert_eq!(MaturityStage::from_score(25.0), MaturityStage::WarmingUp);
        assert_eq!(MaturityStage::from_score(37.5), MaturityStage::WarmingUp);
        assert_eq!(MaturityStage::from_score(50.0), MaturityStage::Learning);
        assert_eq!(MaturityStage::from_score(75.0), MaturityStage::Confident);
        assert_eq!(MaturityStage::from_score(100.0), MaturityStage::Confident);
    }

    #[test]
    fn parses_loose_casing() {
        assert_eq!("warming_up".parse(), Ok(MaturityStage::WarmingUp));
        assert_eq!(" Warming Up ".parse(), Ok(MaturityStage::WarmingUp));
        assert_eq!("CONFIDENT".parse(), Ok(MaturityStage::Confident));
        assert!("mature".parse::<MaturityStage>().is_err());
    }
}
