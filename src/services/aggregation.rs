//! Dashboard and report read-models assembled from independent repository
//! queries.
//!
//! Each aggregation fans its sub-queries out concurrently with
//! `tokio::try_join!` on the request task, joins auxiliary lookups (stage
//! names) in memory, and fails as a whole if any single sub-query fails.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::db::crm_repository::CrmRepository;
use crate::models::crm::{
    CustomerSummary, LeadStage, LeadSummary, Scope, TaskPriority, TaskStatus, TaskSummary,
};
use crate::models::dashboard::{
    ActivityItem, ActivityKind, DashboardStats, LeadReport, StageCounts, TaskReport,
};
use crate::models::user::Identity;

pub const RECENT_RECORDS_LIMIT: i64 = 5;
pub const ACTIVITY_PER_KIND: i64 = 3;
pub const ACTIVITY_FEED_LIMIT: usize = 10;
pub const ACTIVE_LEAD_WINDOW_DAYS: i64 = 30;
pub const UNKNOWN_BUCKET: &str = "Unknown";

#[derive(Debug, Error)]
#[error("aggregation sub-query `{query}` failed: {source}")]
pub struct AggregationError {
    pub query: &'static str,
    #[source]
    pub source: sqlx::Error,
}

/// Tags a repository future with the name reported if it fails.
async fn sub_query<T, F>(query: &'static str, fut: F) -> Result<T, AggregationError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    fut.await
        .map_err(|source| AggregationError { query, source })
}

/// `part / total * 100` rounded to two decimals; `0` when there is no total.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = part as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Start of the UTC day containing `now`, and the start of the next one.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

pub async fn compute_stats(
    repo: &dyn CrmRepository,
    now: DateTime<Utc>,
) -> Result<DashboardStats, AggregationError> {
    let scope = Scope::All;
    let (today, tomorrow) = day_bounds(now);
    let active_since = now - Duration::days(ACTIVE_LEAD_WINDOW_DAYS);

    let (
        total_customers,
        total_leads,
        total_tasks,
        total_users,
        tasks_due_today,
        overdue_tasks,
        completed_tasks,
        active_leads,
        histogram,
        recent_customers,
        recent_tasks,
    ) = tokio::try_join!(
        sub_query("total_customers", repo.count_customers(scope)),
        sub_query("total_leads", repo.count_leads(scope)),
        sub_query("total_tasks", repo.count_tasks(scope)),
        sub_query("total_users", repo.count_users()),
        sub_query(
            "tasks_due_today",
            repo.count_tasks_due_between(scope, today, tomorrow)
        ),
        sub_query("overdue_tasks", repo.count_overdue_tasks(scope, now)),
        sub_query(
            "completed_tasks",
            repo.count_tasks_with_status(scope, TaskStatus::Completed)
        ),
        sub_query("active_leads", repo.count_active_leads(scope, active_since)),
        sub_query("lead_stage_histogram", repo.lead_stage_histogram(scope)),
        sub_query(
            "recent_customers",
            repo.recent_customers(scope, RECENT_RECORDS_LIMIT)
        ),
        sub_query("recent_tasks", repo.recent_tasks(scope, RECENT_RECORDS_LIMIT)),
    )?;

    let stages = sub_query("lead_stages", repo.list_lead_stages()).await?;

    Ok(DashboardStats {
        total_customers,
        total_leads,
        total_tasks,
        total_users,
        tasks_due_today,
        overdue_tasks,
        completed_tasks,
        active_leads,
        task_completion_rate: percentage(completed_tasks, total_tasks),
        recent_customers,
        recent_tasks,
        lead_pipeline: resolve_stage_names(&stages, &histogram),
    })
}

/// Most recent records owned by or assigned to `identity`, newest first.
pub async fn compute_recent_activity(
    repo: &dyn CrmRepository,
    identity: &Identity,
) -> Result<Vec<ActivityItem>, AggregationError> {
    let scope = Scope::Owner(identity.subject_id);

    let (customers, leads, tasks) = tokio::try_join!(
        sub_query("recent_customers", repo.recent_customers(scope, ACTIVITY_PER_KIND)),
        sub_query("recent_leads", repo.recent_leads(scope, ACTIVITY_PER_KIND)),
        sub_query("recent_tasks", repo.recent_tasks(scope, ACTIVITY_PER_KIND)),
    )?;

    Ok(merge_activity(customers, leads, tasks))
}

/// Concatenates customers, leads, then tasks and orders them newest first.
/// The sort is stable, so equal timestamps keep that concatenation order.
pub fn merge_activity(
    customers: Vec<CustomerSummary>,
    leads: Vec<LeadSummary>,
    tasks: Vec<TaskSummary>,
) -> Vec<ActivityItem> {
    let customers = customers.into_iter().map(|c| ActivityItem {
        kind: ActivityKind::CustomerCreated,
        id: c.id,
        title: c.name,
        timestamp: c.created_at,
    });
    let leads = leads.into_iter().map(|l| ActivityItem {
        kind: ActivityKind::LeadCreated,
        id: l.id,
        title: l.title,
        timestamp: l.created_at,
    });
    let tasks = tasks.into_iter().map(|t| ActivityItem {
        kind: ActivityKind::TaskCreated,
        id: t.id,
        title: t.title,
        timestamp: t.created_at,
    });

    let mut items: Vec<ActivityItem> = customers.chain(leads).chain(tasks).collect();
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(ACTIVITY_FEED_LIMIT);
    items
}

pub async fn compute_task_report(
    repo: &dyn CrmRepository,
    scope: Scope,
    now: DateTime<Utc>,
) -> Result<TaskReport, AggregationError> {
    let (by_status, by_priority, overdue_tasks) = tokio::try_join!(
        sub_query("tasks_by_status", repo.tasks_by_status(scope)),
        sub_query("tasks_by_priority", repo.tasks_by_priority(scope)),
        sub_query("overdue_tasks", repo.count_overdue_tasks(scope, now)),
    )?;

    let mut status_counts: BTreeMap<String, i64> = TaskStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for (status, count) in &by_status {
        *status_counts.entry(status.as_str().to_string()).or_default() += count;
    }

    let mut priority_counts: BTreeMap<String, i64> = TaskPriority::ALL
        .iter()
        .map(|priority| (priority.as_str().to_string(), 0))
        .collect();
    for (priority, count) in &by_priority {
        *priority_counts
            .entry(priority.as_str().to_string())
            .or_default() += count;
    }

    let total_tasks: i64 = by_status.iter().map(|(_, count)| count).sum();
    let completed_tasks = status_counts
        .get(TaskStatus::Completed.as_str())
        .copied()
        .unwrap_or(0);

    Ok(TaskReport {
        total_tasks,
        completed_tasks,
        overdue_tasks,
        task_completion_rate: percentage(completed_tasks, total_tasks),
        by_status: status_counts,
        by_priority: priority_counts,
    })
}

pub async fn compute_lead_report(
    repo: &dyn CrmRepository,
    scope: Scope,
    now: DateTime<Utc>,
) -> Result<LeadReport, AggregationError> {
    let active_since = now - Duration::days(ACTIVE_LEAD_WINDOW_DAYS);

    let (total_leads, active_leads, histogram, by_source) = tokio::try_join!(
        sub_query("total_leads", repo.count_leads(scope)),
        sub_query("active_leads", repo.count_active_leads(scope, active_since)),
        sub_query("lead_stage_histogram", repo.lead_stage_histogram(scope)),
        sub_query("leads_by_source", repo.leads_by_source(scope)),
    )?;

    let stages = sub_query("lead_stages", repo.list_lead_stages()).await?;

    let won_leads: i64 = histogram
        .iter()
        .filter(|(stage_id, _)| {
            stage_id.is_some_and(|id| stages.iter().any(|s| s.id == id && s.is_won))
        })
        .map(|(_, count)| count)
        .sum();

    let mut source_counts: BTreeMap<String, i64> = BTreeMap::new();
    for (source, count) in by_source {
        let name = source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_BUCKET.to_string());
        *source_counts.entry(name).or_default() += count;
    }

    Ok(LeadReport {
        total_leads,
        active_leads,
        won_leads,
        conversion_rate: percentage(won_leads, total_leads),
        by_stage: resolve_stage_names(&stages, &histogram),
        by_source: source_counts,
    })
}

/// Joins stage ids to names in pipeline order. Every known stage is listed,
/// even with zero leads; leads with no stage or a stage id that no longer
/// exists are counted under [`UNKNOWN_BUCKET`] at the end. If a real stage
/// already uses that name, the orphan bucket gets a numbered variant instead.
pub fn resolve_stage_names(stages: &[LeadStage], histogram: &[(Option<Uuid>, i64)]) -> StageCounts {
    let mut ordered: Vec<&LeadStage> = stages.iter().collect();
    ordered.sort_by_key(|stage| stage.position);

    let mut by_id: HashMap<Uuid, i64> = HashMap::new();
    let mut unknown: i64 = 0;
    for (stage_id, count) in histogram {
        match stage_id {
            Some(id) if stages.iter().any(|s| s.id == *id) => {
                *by_id.entry(*id).or_default() += count;
            }
            _ => unknown += count,
        }
    }

    let mut pipeline = StageCounts::default();
    for stage in ordered {
        pipeline.add(&stage.name, by_id.get(&stage.id).copied().unwrap_or(0));
    }
    if unknown > 0 {
        let name = orphan_bucket_name(&pipeline);
        pipeline.add(&name, unknown);
    }
    pipeline
}

fn orphan_bucket_name(pipeline: &StageCounts) -> String {
    let taken = |name: &str| pipeline.names().any(|existing| existing == name);
    if !taken(UNKNOWN_BUCKET) {
        return UNKNOWN_BUCKET.to_string();
    }
    (2..)
        .map(|n| format!("{UNKNOWN_BUCKET} ({n})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| UNKNOWN_BUCKET.to_string())
}
