//! Domain values produced by the mappers.
//!
//! # Design
//! Values are immutable snapshots of what the server returned. Fields the
//! server may legitimately omit are `Option`s; the mapper never fills them
//! with guesses. Call-site defaults live on the types as explicit helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::WireEnum;

/// A registered account. Two users with the same `user_id` are the same user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub created_date: Option<DateTime<Utc>>,
}

/// A task owned by a user. `user_id` refers back to the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub task_id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn priority_or_default(&self) -> TaskPriority {
        self.priority.unwrap_or_default()
    }

    pub fn status_or_default(&self) -> TaskStatus {
        self.status.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn all() -> &'static [TaskPriority] {
        &[TaskPriority::Low, TaskPriority::Medium, TaskPriority::High]
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl WireEnum for TaskPriority {
    const TYPE_NAME: &'static str = "TaskPriority";
    const MEMBERS: &'static [(&'static str, Self)] = &[
        ("LOW", TaskPriority::Low),
        ("MEDIUM", TaskPriority::Medium),
        ("HIGH", TaskPriority::High),
    ];
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed]
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    /// The forward transition callers are expected to request.
    /// Not enforced by the adapter.
    pub fn next(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Pending => Some(TaskStatus::InProgress),
            TaskStatus::InProgress => Some(TaskStatus::Completed),
            TaskStatus::Completed => None,
        }
    }
}

impl WireEnum for TaskStatus {
    const TYPE_NAME: &'static str = "TaskStatus";
    const MEMBERS: &'static [(&'static str, Self)] = &[
        ("PENDING", TaskStatus::Pending),
        ("IN_PROGRESS", TaskStatus::InProgress),
        ("COMPLETED", TaskStatus::Completed),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::to_enum;

    #[test]
    fn wire_names_match_lookup_table() {
        for p in TaskPriority::all() {
            assert_eq!(to_enum::<TaskPriority>(Some(p.as_wire())), Some(*p));
        }
        for s in TaskStatus::all() {
            assert_eq!(to_enum::<TaskStatus>(Some(s.as_wire())), Some(*s));
        }
    }

    #[test]
    fn status_moves_forward_only() {
        assert_eq!(TaskStatus::Pending.next(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::InProgress.next(), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::Completed.next(), None);
    }

    #[test]
    fn call_site_defaults() {
        let task = Task {
            task_id: 1,
            user_id: 2,
            title: None,
            description: None,
            due_date: None,
            priority: None,
            status: None,
            created_date: None,
            last_modified_date: None,
        };
        assert_eq!(task.priority_or_default(), TaskPriority::Medium);
        assert_eq!(task.status_or_default(), TaskStatus::Pending);
    }
}
