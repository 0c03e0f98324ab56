//! Aggregates shown on dashboards and the reports page.

use serde::{Deserialize, Serialize};

use super::task::{Task, TaskPriority, TaskStatus};
use super::user::Role;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub todo: i64,
    pub in_progress: i64,
    pub review: i64,
    pub done: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub urgent: i64,
}

/// Task statistics over some set of tasks.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub by_status: StatusCounts,
    pub by_priority: PriorityCounts,
    /// Not done and past their due date.
    pub overdue: i64,
    /// Share of done tasks in `[0, 1]`; `0` when there are no tasks.
    pub completion_rate: f64,
}

impl TaskStats {
    pub fn from_counts(
        status_counts: &[(TaskStatus, i64)],
        priority_counts: &[(TaskPriority, i64)],
        overdue: i64,
    ) -> Self {
        let mut by_status = StatusCounts::default();
        for (status, count) in status_counts {
            match status {
                TaskStatus::Todo => by_status.todo += count,
                TaskStatus::InProgress => by_status.in_progress += count,
                TaskStatus::Review => by_status.review += count,
                TaskStatus::Done => by_status.done += count,
            }
        }

        let mut by_priority = PriorityCounts::default();
        for (priority, count) in priority_counts {
            match priority {
                TaskPriority::Low => by_priority.low += count,
                TaskPriority::Medium => by_priority.medium += count,
                TaskPriority::High => by_priority.high += count,
                TaskPriority::Urgent => by_priority.urgent += count,
            }
        }

        let total = by_status.todo + by_status.in_progress + by_status.review + by_status.done;
        let completion_rate = if total == 0 {
            0.0
        } else {
            by_status.done as f64 / total as f64
        };

        Self {
            total,
            by_status,
            by_priority,
            overdue,
            completion_rate,
        }
    }
}

/// Which tasks a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    All,
    /// Tasks in projects the manager owns, plus tasks assigned to their direct reports.
    Team(i32),
    /// Tasks assigned to one user.
    Assignee(i32),
}

impl StatsScope {
    pub fn for_role(user_id: i32, role: Role) -> Self {
        match role {
            Role::Admin => StatsScope::All,
            Role::Manager => StatsScope::Team(user_id),
            Role::User => StatsScope::Assignee(user_id),
        }
    }

    /// SQL predicate over the alias `t` for `tasks`, and the value to bind as `$1`.
    pub fn predicate(&self) -> (&'static str, Option<i32>) {
        match self {
            StatsScope::All => ("TRUE", None),
            StatsScope::Team(id) => (
                "(t.project_id IN (SELECT id FROM projects WHERE owner_id = $1) \
                 OR t.assignee_id IN (SELECT id FROM users WHERE manager_id = $1))",
                Some(*id),
            ),
            StatsScope::Assignee(id) => ("t.assignee_id = $1", Some(*id)),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoCounts {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

impl TodoCounts {
    pub fn new(total: i64, completed: i64) -> Self {
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDashboard {
    pub tasks: TaskStats,
    pub todos: TodoCounts,
    /// Open tasks assigned to the user that are due within the next week.
    pub due_soon: Vec<Task>,
}

/// Per-report summary on the manager dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMemberSummary {
    pub user_id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub open_tasks: i64,
    pub done_tasks: i64,
    pub overdue_tasks: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManagerDashboard {
    pub team: Vec<TeamMemberSummary>,
    pub owned_projects: i64,
    pub tasks: TaskStats,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub admin: i64,
    pub manager: i64,
    pub user: i64,
}

impl RoleCounts {
    pub fn from_counts(counts: &[(Role, i64)]) -> Self {
        let mut result = Self::default();
        for (role, count) in counts {
            match role {
                Role::Admin => result.admin += count,
                Role::Manager => result.manager += count,
                Role::User => result.user += count,
            }
        }
        result
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub users_by_role: RoleCounts,
    pub inactive_users: i64,
    pub pending_registrations: i64,
    pub projects: i64,
    pub tasks: TaskStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stats_from_counts() {
        let stats = TaskStats::from_counts(
            &[
                (TaskStatus::Todo, 3),
                (TaskStatus::InProgress, 2),
                (TaskStatus::Done, 5),
            ],
            &[(TaskPriority::High, 4), (TaskPriority::Low, 6)],
            1,
        );

        assert_eq!(stats.total, 10);
        assert_eq!(stats.by_status.review, 0);
        assert_eq!(stats.by_status.done, 5);
        assert_eq!(stats.by_priority.high, 4);
        assert_eq!(stats.by_priority.medium, 0);
        assert_eq!(stats.overdue, 1);
        assert!((stats.completion_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats() {
        let stats = TaskStats::from_counts(&[], &[], 0);
        assert_eq!(stats, TaskStats::default());
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn test_scope_for_role() {
        assert_eq!(StatsScope::for_role(7, Role::Admin), StatsScope::All);
        assert_eq!(StatsScope::for_role(7, Role::Manager), StatsScope::Team(7));
        assert_eq!(StatsScope::for_role(7, Role::User), StatsScope::Assignee(7));

        assert_eq!(StatsScope::All.predicate(), ("TRUE", None));
        let (sql, bind) = StatsScope::Team(7).predicate();
        assert!(sql.contains("manager_id = $1"));
        assert_eq!(bind, Some(7));
    }

    #[test]
    fn test_role_and_todo_counts() {
        let roles = RoleCounts::from_counts(&[(Role::Admin, 1), (Role::User, 12)]);
        assert_eq!(
            roles,
            RoleCounts {
                admin: 1,
                manager: 0,
                user: 12
            }
        );

        assert_eq!(TodoCounts::new(5, 2).pending, 3);
    }
}
