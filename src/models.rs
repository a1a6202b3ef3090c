use chrono::NaiveDate;
use serde::Serialize;

/// Closed set of session health statuses. Unknown keys coming from the
/// database or a CSV import are rejected at the boundary, never stored
/// in this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Healthy,
    Errored,
    Crashed,
    Abnormal,
}

impl SessionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "healthy" => Some(SessionStatus::Healthy),
            "errored" => Some(SessionStatus::Errored),
            "crashed" => Some(SessionStatus::Crashed),
            "abnormal" => Some(SessionStatus::Abnormal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Healthy => "healthy",
            SessionStatus::Errored => "errored",
            SessionStatus::Crashed => "crashed",
            SessionStatus::Abnormal => "abnormal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// One day of session counts for a single status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionBucket {
    pub interval_start: NaiveDate,
    pub count: i64,
}

/// Time-bucketed counts for one (project, status) pair, ordered by
/// interval start. A date with no bucket counts as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSeries {
    pub project_id: i64,
    pub status: SessionStatus,
    pub buckets: Vec<SessionBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub status: SessionStatus,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendCategory {
    Regressing,
    Improving,
    Flat,
}

impl TrendCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TrendCategory::Regressing => "Regressing",
            TrendCategory::Improving => "Improving",
            TrendCategory::Flat => "Flat",
        }
    }
}

/// A project paired with its true trend. `trend` is `None` when either
/// window had no sessions; the zero default used for ranking is never
/// stored here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProject {
    pub project: ProjectRecord,
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendGroup {
    pub category: TrendCategory,
    pub entries: Vec<RankedProject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_known_keys() {
        assert_eq!(SessionStatus::parse("healthy"), Some(SessionStatus::Healthy));
        assert_eq!(SessionStatus::parse("crashed"), Some(SessionStatus::Crashed));
        assert_eq!(SessionStatus::parse("errored"), Some(SessionStatus::Errored));
        assert_eq!(SessionStatus::parse("abnormal"), Some(SessionStatus::Abnormal));
    }

    #[test]
    fn status_parse_rejects_unknown_keys() {
        assert_eq!(SessionStatus::parse("degraded"), None);
        assert_eq!(SessionStatus::parse(""), None);
        assert_eq!(SessionStatus::parse("Healthy"), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SessionStatus::Healthy,
            SessionStatus::Errored,
            SessionStatus::Crashed,
            SessionStatus::Abnormal,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
    }
}
