use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::crm_repository::CrmRepository,
    models::crm::{
        CustomerSummary, LeadStage, LeadSummary, Scope, TaskPriority, TaskRecord, TaskStatus,
        TaskSummary, TaskUpdate,
    },
};

// `$1` is the optional owner id; NULL means every row.
const OWNER_FILTER: &str = "($1::uuid IS NULL OR assigned_to = $1 OR created_by = $1)";

const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, assigned_to, \
                            created_by, created_at, updated_at";

pub struct PostgresCrmRepository {
    pub pool: PgPool,
}

impl PostgresCrmRepository {
    async fn count_scoped(&self, table: &str, scope: Scope) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {OWNER_FILTER}");
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.owner_id())
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl CrmRepository for PostgresCrmRepository {
    async fn count_customers(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.count_scoped("customers", scope).await
    }

    async fn count_leads(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.count_scoped("leads", scope).await
    }

    async fn count_tasks(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.count_scoped("tasks", scope).await
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn count_tasks_due_between(
        &self,
        scope: Scope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM tasks WHERE {OWNER_FILTER} AND due_date >= $2 AND due_date < $3"
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.owner_id())
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_overdue_tasks(
        &self,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM tasks WHERE {OWNER_FILTER} AND due_date < $2 \
             AND status IN ('pending', 'in_progress')"
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.owner_id())
            .bind(now)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_tasks_with_status(
        &self,
        scope: Scope,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM tasks WHERE {OWNER_FILTER} AND status = $2");
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.owner_id())
            .bind(status)
            .fetch_one(&self.pool)
            .await
    }

    async fn count_active_leads(
        &self,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            "SELECT COUNT(*) FROM leads WHERE {OWNER_FILTER} \
             AND (created_at >= $2 OR updated_at >= $2)"
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(scope.owner_id())
            .bind(since)
            .fetch_one(&self.pool)
            .await
    }

    async fn lead_stage_histogram(
        &self,
        scope: Scope,
    ) -> Result<Vec<(Option<Uuid>, i64)>, sqlx::Error> {
        let sql = format!(
            "SELECT stage_id, COUNT(*) FROM leads WHERE {OWNER_FILTER} GROUP BY stage_id"
        );
        sqlx::query_as::<_, (Option<Uuid>, i64)>(&sql)
            .bind(scope.owner_id())
            .fetch_all(&self.pool)
            .await
    }

    async fn list_lead_stages(&self) -> Result<Vec<LeadStage>, sqlx::Error> {
        sqlx::query_as::<_, LeadStage>(
            r#"
            SELECT id, name, position, is_won
            FROM lead_stages
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn leads_by_source(
        &self,
        scope: Scope,
    ) -> Result<Vec<(Option<String>, i64)>, sqlx::Error> {
        let sql =
            format!("SELECT source, COUNT(*) FROM leads WHERE {OWNER_FILTER} GROUP BY source");
        sqlx::query_as::<_, (Option<String>, i64)>(&sql)
            .bind(scope.owner_id())
            .fetch_all(&self.pool)
            .await
    }

    async fn tasks_by_status(&self, scope: Scope) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        let sql =
            format!("SELECT status, COUNT(*) FROM tasks WHERE {OWNER_FILTER} GROUP BY status");
        sqlx::query_as::<_, (TaskStatus, i64)>(&sql)
            .bind(scope.owner_id())
            .fetch_all(&self.pool)
            .await
    }

    async fn tasks_by_priority(
        &self,
        scope: Scope,
    ) -> Result<Vec<(TaskPriority, i64)>, sqlx::Error> {
        let sql =
            format!("SELECT priority, COUNT(*) FROM tasks WHERE {OWNER_FILTER} GROUP BY priority");
        sqlx::query_as::<_, (TaskPriority, i64)>(&sql)
            .bind(scope.owner_id())
            .fetch_all(&self.pool)
            .await
    }

    async fn recent_customers(
        &self,
        scope: Scope,
        limit: i64,
    ) -> Result<Vec<CustomerSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT id, name, company, created_at FROM customers WHERE {OWNER_FILTER} \
             ORDER BY created_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, CustomerSummary>(&sql)
            .bind(scope.owner_id())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn recent_leads(&self, scope: Scope, limit: i64) -> Result<Vec<LeadSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT id, title, created_at FROM leads WHERE {OWNER_FILTER} \
             ORDER BY created_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, LeadSummary>(&sql)
            .bind(scope.owner_id())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn recent_tasks(&self, scope: Scope, limit: i64) -> Result<Vec<TaskSummary>, sqlx::Error> {
        let sql = format!(
            "SELECT id, title, status, due_date, created_at FROM tasks WHERE {OWNER_FILTER} \
             ORDER BY created_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, TaskSummary>(&sql)
            .bind(scope.owner_id())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<TaskRecord>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                due_date = COALESCE($6, due_date),
                updated_at = now()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TaskRecord>(&sql)
            .bind(task_id)
            .bind(update.title.as_deref())
            .bind(update.description.as_deref())
            .bind(update.status)
            .bind(update.priority)
            .bind(update.due_date)
            .fetch_optional(&self.pool)
            .await
    }
}
