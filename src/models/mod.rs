pub mod comment;
pub mod history;
pub mod project;
pub mod registration;
pub mod stats;
pub mod subtask;
pub mod task;
pub mod task_list;
pub mod todo;
pub mod user;

use serde::{Deserialize, Deserializer};

pub use comment::{CommentInput, TaskComment};
pub use history::{diff_tasks, FieldChange, TaskHistoryEntry};
pub use project::{AddMemberInput, Board, BoardColumn, Project, ProjectInput, ProjectMember, ProjectUpdate};
pub use registration::{
    ApprovalLogEntry, ApproveInput, QueueStatus, RegisterRequest, RegistrationEntry,
    RegistrationQuery, RegistrationStatus, RejectInput,
};
pub use stats::{AdminDashboard, ManagerDashboard, StatsScope, TaskStats, UserDashboard};
pub use subtask::{Subtask, SubtaskInput, SubtaskUpdate};
pub use task::{
    plan_positions, CreateTaskInput, MoveTaskInput, Task, TaskDetail, TaskPriority, TaskQuery,
    TaskStatus, UpdateTaskInput,
};
pub use task_list::{ReorderListsInput, TaskList, TaskListInput};
pub use todo::{Todo, TodoInput, TodoQuery, TodoUpdate};
pub use user::{ChangePasswordInput, Role, UpdateProfileInput, User};


/// For partial updates: distinguishes "field absent" (`None`) from "field set to
/// null" (`Some(None)`). Use together with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
