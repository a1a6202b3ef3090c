use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ProjectRecord, SessionBucket, SessionStatus, StatusSeries};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let projects = vec![
        ("backend", "Backend API"),
        ("frontend", "Web Frontend"),
        ("mobile", "Mobile App"),
    ];

    let mut project_ids = Vec::new();
    for (slug, name) in projects {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO stability.projects (slug, name)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(slug)
        .bind(name)
        .fetch_one(pool)
        .await?
        .get("id");
        project_ids.push((slug, id));
    }

    let today = Utc::now().date_naive();

    for (slug, project_id) in &project_ids {
        // The mobile project stays empty so unavailable rates show up.
        if *slug == "mobile" {
            continue;
        }

        for days_ago in 1..=14i64 {
            let interval_start = today - Duration::days(days_ago);
            let in_last_week = days_ago <= 7;

            let counts: [(SessionStatus, i64); 4] = match *slug {
                // Backend crashes less in the recent week (improving).
                "backend" => [
                    (SessionStatus::Healthy, 920),
                    (SessionStatus::Errored, 12),
                    (SessionStatus::Abnormal, 2),
                    (SessionStatus::Crashed, if in_last_week { 6 } else { 24 }),
                ],
                // Frontend crashes more in the recent week (regressing).
                _ => [
                    (SessionStatus::Healthy, 410),
                    (SessionStatus::Errored, 9),
                    (SessionStatus::Abnormal, 1),
                    (SessionStatus::Crashed, if in_last_week { 32 } else { 8 }),
                ],
            };

            for (status, count) in counts {
                let source_key =
                    format!("seed-{}-{}-{}", slug, status.as_str(), interval_start);
                sqlx::query(
                    r#"
                    INSERT INTO stability.session_counts
                    (id, project_id, status, interval_start, count, source_key)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (source_key) DO NOTHING
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(*project_id)
                .bind(status.as_str())
                .bind(interval_start)
                .bind(count)
                .bind(source_key)
                .execute(pool)
                .await?;
            }
        }
    }

    Ok(())
}

pub async fn fetch_projects(
    pool: &PgPool,
    slug: Option<&str>,
) -> anyhow::Result<Vec<ProjectRecord>> {
    let mut query = String::from("SELECT id, slug, name FROM stability.projects");
    if slug.is_some() {
        query.push_str(" WHERE slug = $1");
    }
    query.push_str(" ORDER BY slug");

    let mut rows = sqlx::query(&query);
    if let Some(value) = slug {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut projects = Vec::new();
    for row in records {
        projects.push(ProjectRecord {
            id: row.get("id"),
            slug: row.get("slug"),
            name: row.get("name"),
        });
    }

    Ok(projects)
}

/// Fetches per-day session counts since `since_date`, grouped by project
/// and status, ordered so that buckets for one (project, status) pair are
/// contiguous and date-ascending. Rows with a status outside the known
/// set are dropped here rather than surfaced untyped.
pub async fn fetch_status_series(
    pool: &PgPool,
    since_date: NaiveDate,
    slug: Option<&str>,
) -> anyhow::Result<Vec<StatusSeries>> {
    let mut query = String::from(
        "SELECT s.project_id, s.status, s.interval_start, \
         SUM(s.count)::BIGINT AS count \
         FROM stability.session_counts s \
         JOIN stability.projects p ON p.id = s.project_id \
         WHERE s.interval_start >= $1",
    );
    if slug.is_some() {
        query.push_str(" AND p.slug = $2");
    }
    query.push_str(
        " GROUP BY s.project_id, s.status, s.interval_start \
         ORDER BY s.project_id, s.status, s.interval_start",
    );

    let mut rows = sqlx::query(&query).bind(since_date);
    if let Some(value) = slug {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut series: Vec<StatusSeries> = Vec::new();

    for row in records {
        let project_id: i64 = row.get("project_id");
        let raw_status: String = row.get("status");
        let status = match SessionStatus::parse(&raw_status) {
            Some(status) => status,
            None => continue,
        };
        let bucket = SessionBucket {
            interval_start: row.get("interval_start"),
            count: row.get("count"),
        };

        match series.last_mut() {
            Some(current)
                if current.project_id == project_id && current.status == status =>
            {
                current.buckets.push(bucket);
            }
            _ => series.push(StatusSeries {
                project_id,
                status,
                buckets: vec![bucket],
            }),
        }
    }

    Ok(series)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        project_slug: String,
        project_name: String,
        status: String,
        interval_start: NaiveDate,
        count: i64,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let status = SessionStatus::parse(&row.status)
            .with_context(|| format!("unknown session status '{}'", row.status))?;

        let project_id: i64 = sqlx::query(
            r#"
            INSERT INTO stability.projects (slug, name)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(&row.project_slug)
        .bind(&row.project_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO stability.session_counts
            (id, project_id, status, interval_start, count, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(status.as_str())
        .bind(row.interval_start)
        .bind(row.count)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
