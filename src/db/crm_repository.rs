use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::crm::{
    CustomerSummary, LeadStage, LeadSummary, Scope, TaskPriority, TaskRecord, TaskStatus,
    TaskSummary, TaskUpdate,
};

/// Read side of the CRM entities used by the dashboard and reports, plus the
/// single-task operations the task routes need.
///
/// Every scoped method narrows to records assigned to or created by the owner
/// when given `Scope::Owner`.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    async fn count_customers(&self, scope: Scope) -> Result<i64, sqlx::Error>;
    async fn count_leads(&self, scope: Scope) -> Result<i64, sqlx::Error>;
    async fn count_tasks(&self, scope: Scope) -> Result<i64, sqlx::Error>;
    async fn count_users(&self) -> Result<i64, sqlx::Error>;
    /// Tasks with a due date in `[start, end)`.
    async fn count_tasks_due_between(
        &self,
        scope: Scope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>;
    /// Open tasks whose due date is before `now`.
    async fn count_overdue_tasks(&self, scope: Scope, now: DateTime<Utc>)
        -> Result<i64, sqlx::Error>;
    async fn count_tasks_with_status(
        &self,
        scope: Scope,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error>;
    /// Leads created or updated at or after `since`.
    async fn count_active_leads(
        &self,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error>;

    /// Lead counts grouped by stage id; `None` for leads without a stage.
    async fn lead_stage_histogram(
        &self,
        scope: Scope,
    ) -> Result<Vec<(Option<Uuid>, i64)>, sqlx::Error>;
    async fn list_lead_stages(&self) -> Result<Vec<LeadStage>, sqlx::Error>;
    async fn leads_by_source(&self, scope: Scope)
        -> Result<Vec<(Option<String>, i64)>, sqlx::Error>;
    async fn tasks_by_status(&self, scope: Scope) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error>;
    async fn tasks_by_priority(
        &self,
        scope: Scope,
    ) -> Result<Vec<(TaskPriority, i64)>, sqlx::Error>;

    /// Newest first.
    async fn recent_customers(
        &self,
        scope: Scope,
        limit: i64,
    ) -> Result<Vec<CustomerSummary>, sqlx::Error>;
    async fn recent_leads(&self, scope: Scope, limit: i64) -> Result<Vec<LeadSummary>, sqlx::Error>;
    async fn recent_tasks(&self, scope: Scope, limit: i64) -> Result<Vec<TaskSummary>, sqlx::Error>;

    async fn find_task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, sqlx::Error>;
    /// Applies the present fields; `None` when the task does not exist.
    async fn update_task(
        &self,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<TaskRecord>, sqlx::Error>;
}
