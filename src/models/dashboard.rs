use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use uuid::Uuid;

use super::crm::{CustomerSummary, TaskSummary};

/// Stage name to lead count, kept in pipeline order and serialized as a JSON
/// object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts(Vec<(String, i64)>);

impl StageCounts {
    /// Adds to an existing bucket of the same name, or appends a new one.
    pub fn add(&mut self, name: &str, count: i64) {
        match self.0.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, total)) => *total += count,
            None => self.0.push((name.to_string(), count)),
        }
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, count)| *count)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn total(&self) -> i64 {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for StageCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in &self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: i64,
    pub total_leads: i64,
    pub total_tasks: i64,
    pub total_users: i64,
    pub tasks_due_today: i64,
    pub overdue_tasks: i64,
    pub completed_tasks: i64,
    pub active_leads: i64,
    pub task_completion_rate: f64,
    pub recent_customers: Vec<CustomerSummary>,
    pub recent_tasks: Vec<TaskSummary>,
    pub lead_pipeline: StageCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    CustomerCreated,
    LeadCreated,
    TaskCreated,
}

/// One entry of the merged recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub id: Uuid,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub task_completion_rate: f64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadReport {
    pub total_leads: i64,
    pub active_leads: i64,
    pub won_leads: i64,
    pub conversion_rate: f64,
    pub by_stage: StageCounts,
    pub by_source: BTreeMap<String, i64>,
}
