use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};

use crate::models::{
    ProjectRecord, RankedProject, SessionStatus, StatusSeries, TrendCategory, TrendGroup,
};

pub fn cutoff_date(window_days: i64) -> NaiveDate {
    Utc::now().date_naive() - Duration::days(window_days.max(1))
}

/// Crash-free rate over a set of status series: healthy sessions divided
/// by all sessions. Returns `None` when the window holds no sessions at
/// all. Negative counts are treated as zero.
pub fn crash_free_rate(groups: &[StatusSeries]) -> Option<f64> {
    rate_of(groups.iter())
}

/// Same as [`crash_free_rate`], restricted to one project inside a series
/// collection that mixes several projects.
pub fn project_crash_free_rate(groups: &[StatusSeries], project_id: i64) -> Option<f64> {
    rate_of(groups.iter().filter(|group| group.project_id == project_id))
}

fn rate_of<'a>(groups: impl Iterator<Item = &'a StatusSeries>) -> Option<f64> {
    let mut total = 0i64;
    let mut healthy = 0i64;

    for group in groups {
        let sum: i64 = group.buckets.iter().map(|bucket| bucket.count.max(0)).sum();
        total += sum;
        if group.status == SessionStatus::Healthy {
            healthy += sum;
        }
    }

    if total == 0 {
        None
    } else {
        Some(healthy as f64 / total as f64)
    }
}

/// Signed change in crash-free rate between the reference period and the
/// recent week. Positive means the week is healthier. Unavailable inputs
/// propagate; a NaN difference is normalized to unavailable.
pub fn trend(period_rate: Option<f64>, week_rate: Option<f64>) -> Option<f64> {
    match (period_rate, week_rate) {
        (Some(period), Some(week)) => {
            let diff = week - period;
            if diff.is_nan() {
                None
            } else {
                Some(diff)
            }
        }
        _ => None,
    }
}

/// Sort key for ranking: the trend itself, with unavailable defaulting to
/// zero. Only ever used transiently for ordering; the true trend is kept
/// alongside so "flat because zero" and "flat because no data" stay
/// distinguishable downstream.
pub fn ranking_value(trend: Option<f64>) -> f64 {
    match trend {
        Some(value) if !value.is_nan() => value,
        _ => 0.0,
    }
}

/// Sign-based classification. Zero and unavailable both land in `Flat`.
pub fn classify(trend: Option<f64>) -> TrendCategory {
    match trend {
        Some(value) if value > 0.0 => TrendCategory::Improving,
        Some(value) if value < 0.0 => TrendCategory::Regressing,
        _ => TrendCategory::Flat,
    }
}

/// Ranks projects by descending absolute trend magnitude (stable on ties)
/// and partitions them into regressing, improving, and flat groups, in
/// that order. Every input project appears in exactly one group.
pub fn rank_and_group<F>(projects: &[ProjectRecord], trend_of: F) -> Vec<TrendGroup>
where
    F: Fn(&ProjectRecord) -> Option<f64>,
{
    let mut ranked: Vec<RankedProject> = projects
        .iter()
        .map(|project| {
            let trend = trend_of(project).filter(|value| !value.is_nan());
            RankedProject {
                project: project.clone(),
                trend,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        ranking_value(b.trend)
            .abs()
            .partial_cmp(&ranking_value(a.trend).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut regressing = Vec::new();
    let mut improving = Vec::new();
    let mut flat = Vec::new();

    for entry in ranked {
        match classify(entry.trend) {
            TrendCategory::Regressing => regressing.push(entry),
            TrendCategory::Improving => improving.push(entry),
            TrendCategory::Flat => flat.push(entry),
        }
    }

    vec![
        TrendGroup {
            category: TrendCategory::Regressing,
            entries: regressing,
        },
        TrendGroup {
            category: TrendCategory::Improving,
            entries: improving,
        },
        TrendGroup {
            category: TrendCategory::Flat,
            entries: flat,
        },
    ]
}

/// Per-day crash-free rate for one project, aligned by interval date
/// across statuses. A status missing a date counts as zero; a day with no
/// sessions at all is unavailable.
pub fn daily_crash_free(
    groups: &[StatusSeries],
    project_id: i64,
) -> Vec<(NaiveDate, Option<f64>)> {
    let mut totals: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

    for group in groups.iter().filter(|group| group.project_id == project_id) {
        for bucket in &group.buckets {
            let entry = totals.entry(bucket.interval_start).or_insert((0, 0));
            let count = bucket.count.max(0);
            entry.0 += count;
            if group.status == SessionStatus::Healthy {
                entry.1 += count;
            }
        }
    }

    totals
        .into_iter()
        .map(|(date, (total, healthy))| {
            let rate = if total == 0 {
                None
            } else {
                Some(healthy as f64 / total as f64)
            };
            (date, rate)
        })
        .collect()
}
