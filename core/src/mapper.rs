//! Payload node to domain value mapping.
//!
//! A mapper either yields a complete record or `None`. Records missing an
//! identifier are never handed to callers half-filled.

use crate::coerce::{to_enum, to_identifier, to_timestamp};
use crate::navigator::RecordShape;
use crate::tree::Tree;
use crate::types::{Task, User};

pub const USER_SHAPE: RecordShape = RecordShape {
    id_field: "userId",
    any_of: &["username", "email"],
};

pub const TASK_SHAPE: RecordShape = RecordShape {
    id_field: "taskId",
    any_of: &["title", "status", "user"],
};

/// Ordered lookups for a task's owner: nested `user.userId` first, then a
/// flattened `userId`.
const OWNER_LOOKUPS: &[fn(&Tree) -> Option<&str>] = &[nested_owner, flattened_owner];

fn nested_owner(node: &Tree) -> Option<&str> {
    node.child("user").and_then(|user| user.text("userId"))
}

fn flattened_owner(node: &Tree) -> Option<&str> {
    node.text("userId")
}

pub fn map_user(node: &Tree) -> Option<User> {
    let mut user_id = to_identifier(node.text("userId"));
    let mut username = node.text("username");
    let mut email = node.text("email");
    let mut created = node.text("createdDate");

    if user_id.is_none() || username.is_none() || email.is_none() {
        if let Some(inner) = node.child("return") {
            tracing::debug!(stage = "map.user", "filling missing user fields from nested return");
            user_id = user_id.or_else(|| to_identifier(inner.text("userId")));
            username = username.or_else(|| inner.text("username"));
            email = email.or_else(|| inner.text("email"));
            created = created.or_else(|| inner.text("createdDate"));
        }
    }

    let (Some(user_id), Some(username), Some(email)) = (user_id, username, email) else {
        tracing::warn!(
            stage = "map.user",
            fields = ?node.names(),
            "user record lacks userId, username or email"
        );
        return None;
    };

    Some(User {
        user_id,
        username: username.to_string(),
        email: email.to_string(),
        created_date: to_timestamp(created),
    })
}

pub fn map_task(node: &Tree) -> Option<Task> {
    let task_id = to_identifier(node.text("taskId"));
    let user_id = OWNER_LOOKUPS
        .iter()
        .find_map(|lookup| to_identifier(lookup(node)));

    let (Some(task_id), Some(user_id)) = (task_id, user_id) else {
        tracing::warn!(
            stage = "map.task",
            task_id = ?task_id,
            fields = ?node.names(),
            "task record lacks taskId or owning userId; skipping"
        );
        return None;
    };

    let task = Task {
        task_id,
        user_id,
        title: node.text("title").map(str::to_string),
        description: node.text("description").map(str::to_string),
        due_date: to_timestamp(node.text("dueDate")),
        priority: to_enum(node.text("priority")),
        status: to_enum(node.text("status")),
        created_date: to_timestamp(node.text("createdDate")),
        last_modified_date: to_timestamp(node.text("lastModifiedDate")),
    };
    tracing::trace!(stage = "map.task", task_id, user_id, "mapped task");
    Some(task)
}
