use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl TrendPeriod {
    pub const ALL: [TrendPeriod; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn window(self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
        }
    }

    /// Start of the window that ends at `now`.
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window()
    }
}

impl fmt::Display for TrendPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendPeriod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DomainError::invalid(format!(
                "unknown period `{other}` (expected daily|weekly|monthly)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendingProduct {
    pub product_id: ProductId,
    pub period: TrendPeriod,
    pub trend_score: f64,
    pub view_count: u32,
    pub purchase_count: u32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::TrendPeriod;

    #[test]
    fn windows_cover_one_seven_and_thirty_days() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).single().unwrap_or_default();
        assert_eq!(now - TrendPeriod::Daily.window_start(now), Duration::days(1));
        assert_eq!(now - TrendPeriod::Weekly.window_start(now), Duration::days(7));
        assert_eq!(now - TrendPeriod::Monthly.window_start(now), Duration::days(30));
    }

    #[test]
    fn period_parsing_is_case_insensitive() {
        assert_eq!("Weekly".parse::<TrendPeriod>(), Ok(TrendPeriod::Weekly));
        assert!("yearly".parse::<TrendPeriod>().is_err());
    }
}
