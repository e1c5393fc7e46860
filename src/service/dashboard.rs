use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::store::{TenantId, audit_logs, contacts};

/// Comparison window of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    Week,
    #[default]
    Month,
    Quarter,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            _ => Err(ApiError::bad_request(
                "invalid period. must be: week, month, or quarter",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub current: i64,
    pub previous: i64,
    pub growth_percentage: f64,
}

impl Trend {
    fn new(current: i64, previous: i64) -> Self {
        Self {
            current,
            previous,
            growth_percentage: growth_percentage(current, previous),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_contacts: Trend,
    pub recent_activities: Trend,
    pub growth_rate: f64,
}

/// Percentage change from `previous` to `current`. Growth from nothing is
/// reported as 100.
#[allow(clippy::cast_precision_loss)]
pub fn growth_percentage(current: i64, previous: i64) -> f64 {
    match (current, previous) {
        (0, 0) => 0.0,
        (_, 0) => 100.0,
        (c, p) => (c - p) as f64 / p as f64 * 100.0,
    }
}

/// Contact creations and audit activity in the window ending at `now`,
/// against the window of the same length before it.
#[tracing::instrument(skip(pool), fields(tenant_id = %tenant, period = %period), err)]
pub async fn stats(
    pool: &PgPool,
    tenant: TenantId,
    period: Period,
    now: DateTime<Utc>,
) -> Result<DashboardStats, ApiError> {
    let span = Duration::days(period.days());
    let current_start = now - span;
    let previous_start = current_start - span;
    // Windows are half-open; nudge the end so rows stamped `now` still count.
    let current_end = now + Duration::microseconds(1);

    let contacts_now = contacts::count_created_between(pool, tenant, current_start, current_end).await?;
    let contacts_before =
        contacts::count_created_between(pool, tenant, previous_start, current_start).await?;
    let activity_now = audit_logs::count_between(pool, tenant, current_start, current_end).await?;
    let activity_before =
        audit_logs::count_between(pool, tenant, previous_start, current_start).await?;

    let total_contacts = Trend::new(contacts_now, contacts_before);
    Ok(DashboardStats {
        growth_rate: total_contacts.growth_percentage,
        total_contacts,
        recent_activities: Trend::new(activity_now, activity_before),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 0, 100.0)]
    #[case(0, 0, 0.0)]
    #[case(5, 10, -50.0)]
    #[case(15, 10, 50.0)]
    #[case(0, 4, -100.0)]
    fn growth_cases(#[case] current: i64, #[case] previous: i64, #[case] want: f64) {
        assert!((growth_percentage(current, previous) - want).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case("week", 7)]
    #[case("month", 30)]
    #[case("quarter", 90)]
    fn period_days(#[case] raw: &str, #[case] days: i64) {
        let period: Period = raw.parse().unwrap();
        assert_eq!(period.days(), days);
        assert_eq!(period.to_string(), raw);
    }

    #[test]
    fn default_period_is_month() {
        assert_eq!(Period::default(), Period::Month);
    }

    #[test]
    fn unknown_period_rejected() {
        let err = "year".parse::<Period>().unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(ref m) if m == "invalid period. must be: week, month, or quarter")
        );
    }

    proptest! {
        #[test]
        fn growth_sign_follows_change(current in 0i64..100_000, previous in 1i64..100_000) {
            let g = growth_percentage(current, previous);
            prop_assert_eq!(g > 0.0, current > previous);
            prop_assert_eq!(g < 0.0, current < previous);
            prop_assert!(g >= -100.0);
        }
    }
}
