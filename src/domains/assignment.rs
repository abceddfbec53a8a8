use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_id: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub procedure_id: i32,
    pub procedure_title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i32,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A persisted (plan, procedure, user) link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub plan_id: i32,
    pub procedure_id: i32,
    pub user_id: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A link waiting to be inserted; the gateway stamps the timestamps on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewAssignment {
    pub plan_id: i32,
    pub procedure_id: i32,
    pub user_id: i32,
}

impl Assignment {
    pub fn key(&self) -> NewAssignment {
        NewAssignment {
            plan_id: self.plan_id,
            procedure_id: self.procedure_id,
            user_id: self.user_id,
        }
    }
}

/// Deletions and insertions staged for a single atomic save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentChangeSet {
    deletes: Vec<Assignment>,
    inserts: Vec<NewAssignment>,
}

impl AssignmentChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_delete(&mut self, rows: impl IntoIterator<Item = Assignment>) {
        self.deletes.extend(rows);
    }

    pub fn stage_insert(&mut self, rows: impl IntoIterator<Item = NewAssignment>) {
        self.inserts.extend(rows);
    }

    pub fn deletes(&self) -> &[Assignment] {
        &self.deletes
    }

    pub fn inserts(&self) -> &[NewAssignment] {
        &self.inserts
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Assignment>, Vec<NewAssignment>) {
        (self.deletes, self.inserts)
    }
}

/// Replace the users assigned to one procedure of a plan.
///
/// Ids default to `0` when absent from a request body so they fail
/// validation rather than deserialization; `user_ids` stays optional so a
/// missing or `null` list can be told apart from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignUsersCommand {
    #[serde(default)]
    pub plan_id: i32,
    #[serde(default)]
    pub procedure_id: i32,
    #[serde(default)]
    pub user_ids: Option<Vec<i32>>,
}

impl AssignUsersCommand {
    pub fn new(plan_id: i32, procedure_id: i32, user_ids: Vec<i32>) -> Self {
        Self {
            plan_id,
            procedure_id,
            user_ids: Some(user_ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedUser {
    pub user_id: i32,
    pub name: String,
}

impl From<User> for AssignedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
        }
    }
}
