#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use plan_assign::domains::assignment::{Assignment, AssignmentChangeSet, Plan, Procedure, User};
use plan_assign::error::{PlanAssignError, Result};
use plan_assign::interfaces::providers::PersistenceGateway;
use plan_assign::providers::sqlite::SqliteGateway;

/// In-memory gateway that records every call it receives.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<String>>,
    plans: BTreeSet<i32>,
    procedures: BTreeSet<i32>,
    users: BTreeMap<i32, String>,
    assignments: Mutex<Vec<Assignment>>,
    fail_save: bool,
    cancel_on_list: Option<CancellationToken>,
    cancel_on_save: Option<CancellationToken>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, plan_id: i32) -> Self {
        self.plans.insert(plan_id);
        self
    }

    pub fn with_procedure(mut self, procedure_id: i32) -> Self {
        self.procedures.insert(procedure_id);
        self
    }

    pub fn with_users(mut self, user_ids: &[i32]) -> Self {
        for id in user_ids {
            self.users.insert(*id, format!("User {id}"));
        }
        self
    }

    pub fn with_assignments(self, plan_id: i32, procedure_id: i32, user_ids: &[i32]) -> Self {
        {
            let mut rows = self.assignments.lock().unwrap();
            for user_id in user_ids {
                rows.push(Assignment {
                    plan_id,
                    procedure_id,
                    user_id: *user_id,
                    created_at: 1,
                    updated_at: 1,
                });
            }
        }
        self
    }

    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }

    /// Cancels `token` while existing assignments are being loaded, after
    /// every existence check has passed.
    pub fn cancelling_on_list(mut self, token: CancellationToken) -> Self {
        self.cancel_on_list = Some(token);
        self
    }

    /// Cancels `token` while the change set is being committed.
    pub fn cancelling_on_save(mut self, token: CancellationToken) -> Self {
        self.cancel_on_save = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn assigned_ids(&self, plan_id: i32, procedure_id: i32) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.plan_id == plan_id && row.procedure_id == procedure_id)
            .map(|row| row.user_id)
            .collect();
        ids.sort();
        ids
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn user(&self, user_id: i32) -> Option<User> {
        self.users.get(&user_id).map(|name| User {
            user_id,
            name: name.clone(),
            created_at: 1,
            updated_at: 1,
        })
    }
}

#[async_trait]
impl PersistenceGateway for RecordingGateway {
    async fn find_plan(&self, plan_id: i32) -> Result<Option<Plan>> {
        self.record(format!("find_plan:{plan_id}"));
        Ok(self.plans.contains(&plan_id).then_some(Plan {
            plan_id,
            created_at: 1,
            updated_at: 1,
        }))
    }

    async fn find_procedure(&self, procedure_id: i32) -> Result<Option<Procedure>> {
        self.record(format!("find_procedure:{procedure_id}"));
        Ok(self.procedures.contains(&procedure_id).then(|| Procedure {
            procedure_id,
            procedure_title: format!("Procedure {procedure_id}"),
            created_at: 1,
            updated_at: 1,
        }))
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>> {
        self.record(format!("find_user:{user_id}"));
        Ok(self.user(user_id))
    }

    async fn list_assignments(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<Assignment>> {
        self.record(format!("list_assignments:{plan_id}:{procedure_id}"));
        if let Some(token) = &self.cancel_on_list {
            token.cancel();
        }
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.plan_id == plan_id && row.procedure_id == procedure_id)
            .cloned()
            .collect())
    }

    async fn save(&self, changes: AssignmentChangeSet) -> Result<()> {
        self.record(format!(
            "save:-{}:+{}",
            changes.deletes().len(),
            changes.inserts().len()
        ));
        if let Some(token) = &self.cancel_on_save {
            token.cancel();
            tokio::task::yield_now().await;
        }
        if self.fail_save {
            return Err(PlanAssignError::Storage("database is locked".to_string()));
        }
        let (deletes, inserts) = changes.into_parts();
        let mut rows = self.assignments.lock().unwrap();
        rows.retain(|row| !deletes.iter().any(|gone| gone.key() == row.key()));
        for row in inserts {
            rows.push(Assignment {
                plan_id: row.plan_id,
                procedure_id: row.procedure_id,
                user_id: row.user_id,
                created_at: 2,
                updated_at: 2,
            });
        }
        Ok(())
    }

    async fn assigned_users(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<User>> {
        self.record(format!("assigned_users:{plan_id}:{procedure_id}"));
        Ok(self
            .assigned_ids(plan_id, procedure_id)
            .into_iter()
            .filter_map(|id| self.user(id))
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.record("list_users".to_string());
        Ok(self.users.keys().filter_map(|id| self.user(*id)).collect())
    }
}

/// A migrated SQLite store seeded with one plan, one procedure and users
/// `1..=user_count`.
pub async fn seeded_sqlite(
    dir: &tempfile::TempDir,
    plan_id: i32,
    procedure_id: i32,
    user_count: i32,
) -> SqliteGateway {
    let db_path = dir.path().join("assign.db");
    let gateway = SqliteGateway::open(db_path.to_string_lossy().to_string())
        .await
        .unwrap();
    gateway.create_plan(plan_id).await.unwrap();
    gateway
        .create_procedure(procedure_id, "Chest X-ray")
        .await
        .unwrap();
    for user_id in 1..=user_count {
        gateway
            .create_user(user_id, &format!("User {user_id}"))
            .await
            .unwrap();
    }
    gateway
}
