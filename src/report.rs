use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{ProjectRecord, StatusSeries, StatusSummary};
use crate::stability;

pub fn display_crash_free(rate: Option<f64>) -> String {
    match rate {
        Some(value) => format!("{:.2}%", value * 100.0),
        None => "\u{2014}".to_string(),
    }
}

/// Trend rendered in percentage points, or an em-dash when unavailable.
pub fn display_trend(trend: Option<f64>) -> String {
    match trend {
        Some(value) => format!("{:+.2}pp", value * 100.0),
        None => "\u{2014}".to_string(),
    }
}

pub fn summarize_by_status(series: &[StatusSeries]) -> Vec<StatusSummary> {
    let mut summaries: Vec<StatusSummary> = Vec::new();

    for group in series {
        let sum: i64 = group.buckets.iter().map(|bucket| bucket.count.max(0)).sum();
        match summaries
            .iter_mut()
            .find(|summary| summary.status == group.status)
        {
            Some(summary) => summary.total += sum,
            None => summaries.push(StatusSummary {
                status: group.status,
                total: sum,
            }),
        }
    }

    summaries.sort_by(|a, b| b.total.cmp(&a.total));
    summaries
}

pub fn build_report(
    scope: Option<&str>,
    period_days: i64,
    period_cutoff: NaiveDate,
    week_cutoff: NaiveDate,
    projects: &[ProjectRecord],
    period_series: &[StatusSeries],
    week_series: &[StatusSeries],
) -> String {
    let groups = stability::rank_and_group(projects, |project| {
        stability::trend(
            stability::project_crash_free_rate(period_series, project.id),
            stability::project_crash_free_rate(week_series, project.id),
        )
    });
    let summaries = summarize_by_status(period_series);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all projects");

    let _ = writeln!(output, "# Project Stability Report");
    let _ = writeln!(
        output,
        "Generated for {} (last {} days since {}, week window since {})",
        scope_label, period_days, period_cutoff, week_cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend Groups");

    if projects.is_empty() {
        let _ = writeln!(output, "No projects in scope.");
    } else {
        for group in &groups {
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "### {} ({})",
                group.category.label(),
                group.entries.len()
            );
            if group.entries.is_empty() {
                let _ = writeln!(output, "None.");
                continue;
            }
            for entry in &group.entries {
                let period_rate =
                    stability::project_crash_free_rate(period_series, entry.project.id);
                let week_rate =
                    stability::project_crash_free_rate(week_series, entry.project.id);
                let _ = writeln!(
                    output,
                    "- {} ({}): period {}, last 7 days {}, trend {}",
                    entry.project.name,
                    entry.project.slug,
                    display_crash_free(period_rate),
                    display_crash_free(week_rate),
                    display_trend(entry.trend)
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Session Status Mix");

    let total_sessions: i64 = summaries.iter().map(|summary| summary.total).sum();
    if total_sessions == 0 {
        let _ = writeln!(output, "No sessions recorded for this window.");
    } else {
        for summary in &summaries {
            let share = summary.total as f64 / total_sessions as f64 * 100.0;
            let _ = writeln!(
                output,
                "- {}: {} sessions ({:.1}%)",
                summary.status.as_str(),
                summary.total,
                share
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Crash-Free Rate (last 7 days)");

    if projects.is_empty() {
        let _ = writeln!(output, "No projects in scope.");
    } else {
        for project in projects {
            let daily = stability::daily_crash_free(week_series, project.id);
            if daily.is_empty() {
                let _ = writeln!(output, "- {}: no session data", project.slug);
                continue;
            }
            let rendered: Vec<String> = daily
                .iter()
                .map(|(_, rate)| display_crash_free(*rate))
                .collect();
            let _ = writeln!(output, "- {}: {}", project.slug, rendered.join(", "));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionBucket, SessionStatus};

    fn series(project_id: i64, status: SessionStatus, count: i64) -> StatusSeries {
        StatusSeries {
            project_id,
            status,
            buckets: vec![SessionBucket {
                interval_start: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
                count,
            }],
        }
    }

    fn project(id: i64, slug: &str) -> ProjectRecord {
        ProjectRecord {
            id,
            slug: slug.to_string(),
            name: slug.to_string(),
        }
    }

    #[test]
    fn summarize_totals_per_status_sorted_descending() {
        let input = vec![
            series(1, SessionStatus::Crashed, 5),
            series(1, SessionStatus::Healthy, 95),
            series(2, SessionStatus::Healthy, 40),
        ];
        let summaries = summarize_by_status(&input);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].status, SessionStatus::Healthy);
        assert_eq!(summaries[0].total, 135);
        assert_eq!(summaries[1].total, 5);
    }

    #[test]
    fn unavailable_values_render_as_dash() {
        assert_eq!(display_crash_free(None), "\u{2014}");
        assert_eq!(display_trend(None), "\u{2014}");
        assert_eq!(display_crash_free(Some(0.9812)), "98.12%");
        assert_eq!(display_trend(Some(-0.0491)), "-4.91pp");
        assert_eq!(display_trend(Some(0.0010)), "+0.10pp");
    }

    #[test]
    fn report_marks_projects_without_sessions() {
        let cutoff = NaiveDate::from_ymd_opt(2026, 7, 29).unwrap();
        let week_cutoff = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();
        let projects = vec![project(1, "backend"), project(2, "mobile")];
        let period = vec![
            series(1, SessionStatus::Healthy, 90),
            series(1, SessionStatus::Crashed, 10),
        ];
        let week = vec![
            series(1, SessionStatus::Healthy, 49),
            series(1, SessionStatus::Crashed, 1),
        ];

        let report = build_report(
            None,
            30,
            cutoff,
            week_cutoff,
            &projects,
            &period,
            &week,
        );

        assert!(report.contains("### Improving (1)"));
        assert!(report.contains("### Flat (1)"));
        assert!(report.contains("mobile (mobile): period \u{2014}"));
        assert!(report.contains("- mobile: no session data"));
        assert!(report.contains("healthy: 90 sessions"));
    }

    #[test]
    fn report_handles_empty_window() {
        let cutoff = NaiveDate::from_ymd_opt(2026, 7, 29).unwrap();
        let week_cutoff = NaiveDate::from_ymd_opt(2026, 8, 21).unwrap();
        let report = build_report(Some("backend"), 30, cutoff, week_cutoff, &[], &[], &[]);
        assert!(report.contains("No projects in scope."));
        assert!(report.contains("No sessions recorded for this window."));
    }
}
