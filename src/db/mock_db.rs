use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::crm_repository::CrmRepository;
use super::user_repository::UserRepository;
use crate::models::crm::{
    CustomerSummary, LeadStage, LeadSummary, Scope, TaskPriority, TaskRecord, TaskStatus,
    TaskSummary, TaskUpdate,
};
use crate::models::user::User;

#[derive(Debug, Clone)]
pub struct MockCustomer {
    pub summary: CustomerSummary,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct MockLead {
    pub summary: LeadSummary,
    pub source: Option<String>,
    pub stage_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// In-memory stand-in for both repositories.
///
/// `should_fail` fails every call; `fail_on` fails only the named methods,
/// which is how aggregation tests knock out a single sub-query.
#[derive(Default)]
pub struct MockDb {
    pub should_fail: bool,
    pub fail_on: Mutex<HashSet<&'static str>>,
    pub users: Mutex<Vec<User>>,
    pub customers: Mutex<Vec<MockCustomer>>,
    pub leads: Mutex<Vec<MockLead>>,
    pub stages: Mutex<Vec<LeadStage>>,
    pub tasks: Mutex<Vec<TaskRecord>>,
}

fn owned(scope: Scope, assigned_to: Option<Uuid>, created_by: Uuid) -> bool {
    match scope {
        Scope::All => true,
        Scope::Owner(id) => assigned_to == Some(id) || created_by == id,
    }
}

fn group<K: std::hash::Hash + Eq>(keys: impl Iterator<Item = K>) -> Vec<(K, i64)> {
    let mut counts: HashMap<K, i64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts.into_iter().collect()
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_query(&self, name: &'static str) {
        self.fail_on.lock().unwrap().insert(name);
    }

    fn check(&self, name: &'static str) -> Result<(), sqlx::Error> {
        if self.should_fail || self.fail_on.lock().unwrap().contains(name) {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn add_customer(&self, name: &str, owner: Uuid, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.customers.lock().unwrap().push(MockCustomer {
            summary: CustomerSummary {
                id,
                name: name.into(),
                company: None,
                created_at,
            },
            assigned_to: Some(owner),
            created_by: owner,
        });
        id
    }

    pub fn add_stage(&self, name: &str, position: i32, is_won: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.stages.lock().unwrap().push(LeadStage {
            id,
            name: name.into(),
            position,
            is_won,
        });
        id
    }

    pub fn add_lead(
        &self,
        title: &str,
        owner: Uuid,
        stage_id: Option<Uuid>,
        source: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.leads.lock().unwrap().push(MockLead {
            summary: LeadSummary {
                id,
                title: title.into(),
                created_at,
            },
            source: source.map(str::to_string),
            stage_id,
            assigned_to: Some(owner),
            created_by: owner,
            updated_at: created_at,
        });
        id
    }

    pub fn add_task(
        &self,
        title: &str,
        assigned_to: Uuid,
        status: TaskStatus,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.tasks.lock().unwrap().push(TaskRecord {
            id,
            title: title.into(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date,
            assigned_to,
            created_by: assigned_to,
            created_at,
            updated_at: created_at,
        });
        id
    }

    fn count_tasks_where(&self, scope: Scope, pred: impl Fn(&TaskRecord) -> bool) -> i64 {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| owned(scope, Some(t.assigned_to), t.created_by) && pred(t))
            .count() as i64
    }

    fn scoped_leads(&self, scope: Scope) -> Vec<MockLead> {
        self.leads
            .lock()
            .unwrap()
            .iter()
            .filter(|l| owned(scope, l.assigned_to, l.created_by))
            .cloned()
            .collect()
    }
}

fn newest_first<T: Clone>(
    mut rows: Vec<T>,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    limit: i64,
) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows.truncate(limit.max(0) as usize);
    rows
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check("find_user_by_email")?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.check("find_user_by_id")?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        self.check("delete_user")?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != user_id);
        Ok(users.len() != before)
    }
}

#[async_trait]
impl CrmRepository for MockDb {
    async fn count_customers(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.check("count_customers")?;
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| owned(scope, c.assigned_to, c.created_by))
            .count() as i64)
    }

    async fn count_leads(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.check("count_leads")?;
        Ok(self.scoped_leads(scope).len() as i64)
    }

    async fn count_tasks(&self, scope: Scope) -> Result<i64, sqlx::Error> {
        self.check("count_tasks")?;
        Ok(self.count_tasks_where(scope, |_| true))
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        self.check("count_users")?;
        Ok(self.users.lock().unwrap().len() as i64)
    }

    async fn count_tasks_due_between(
        &self,
        scope: Scope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        self.check("count_tasks_due_between")?;
        Ok(self.count_tasks_where(scope, |t| {
            t.due_date.is_some_and(|due| due >= start && due < end)
        }))
    }

    async fn count_overdue_tasks(
        &self,
        scope: Scope,
        now: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        self.check("count_overdue_tasks")?;
        Ok(self.count_tasks_where(scope, |t| {
            t.status.is_open() && t.due_date.is_some_and(|due| due < now)
        }))
    }

    async fn count_tasks_with_status(
        &self,
        scope: Scope,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error> {
        self.check("count_tasks_with_status")?;
        Ok(self.count_tasks_where(scope, |t| t.status == status))
    }

    async fn count_active_leads(
        &self,
        scope: Scope,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        self.check("count_active_leads")?;
        Ok(self
            .scoped_leads(scope)
            .iter()
            .filter(|l| l.summary.created_at >= since || l.updated_at >= since)
            .count() as i64)
    }

    async fn lead_stage_histogram(
        &self,
        scope: Scope,
    ) -> Result<Vec<(Option<Uuid>, i64)>, sqlx::Error> {
        self.check("lead_stage_histogram")?;
        Ok(group(self.scoped_leads(scope).into_iter().map(|l| l.stage_id)))
    }

    async fn list_lead_stages(&self) -> Result<Vec<LeadStage>, sqlx::Error> {
        self.check("list_lead_stages")?;
        let mut stages = self.stages.lock().unwrap().clone();
        stages.sort_by_key(|s| s.position);
        Ok(stages)
    }

    async fn leads_by_source(
        &self,
        scope: Scope,
    ) -> Result<Vec<(Option<String>, i64)>, sqlx::Error> {
        self.check("leads_by_source")?;
        Ok(group(self.scoped_leads(scope).into_iter().map(|l| l.source)))
    }

    async fn tasks_by_status(&self, scope: Scope) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        self.check("tasks_by_status")?;
        let tasks = self.tasks.lock().unwrap();
        Ok(group(
            tasks
                .iter()
                .filter(|t| owned(scope, Some(t.assigned_to), t.created_by))
                .map(|t| t.status),
        ))
    }

    async fn tasks_by_priority(
        &self,
        scope: Scope,
    ) -> Result<Vec<(TaskPriority, i64)>, sqlx::Error> {
        self.check("tasks_by_priority")?;
        let tasks = self.tasks.lock().unwrap();
        Ok(group(
            tasks
                .iter()
                .filter(|t| owned(scope, Some(t.assigned_to), t.created_by))
                .map(|t| t.priority),
        ))
    }

    async fn recent_customers(
        &self,
        scope: Scope,
        limit: i64,
    ) -> Result<Vec<CustomerSummary>, sqlx::Error> {
        self.check("recent_customers")?;
        let rows: Vec<CustomerSummary> = self
            .customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| owned(scope, c.assigned_to, c.created_by))
            .map(|c| c.summary.clone())
            .collect();
        Ok(newest_first(rows, |c| c.created_at, limit))
    }

    async fn recent_leads(&self, scope: Scope, limit: i64) -> Result<Vec<LeadSummary>, sqlx::Error> {
        self.check("recent_leads")?;
        let rows: Vec<LeadSummary> = self
            .scoped_leads(scope)
            .into_iter()
            .map(|l| l.summary)
            .collect();
        Ok(newest_first(rows, |l| l.created_at, limit))
    }

    async fn recent_tasks(&self, scope: Scope, limit: i64) -> Result<Vec<TaskSummary>, sqlx::Error> {
        self.check("recent_tasks")?;
        let rows: Vec<TaskSummary> = self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| owned(scope, Some(t.assigned_to), t.created_by))
            .map(TaskRecord::summary)
            .collect();
        Ok(newest_first(rows, |t| t.created_at, limit))
    }

    async fn find_task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, sqlx::Error> {
        self.check("find_task")?;
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .cloned())
    }

    async fn update_task(
        &self,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<Option<TaskRecord>, sqlx::Error> {
        self.check("update_task")?;
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = Some(due_date);
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }
}
