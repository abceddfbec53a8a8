use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domains::assignment::{
    AssignUsersCommand, AssignmentChangeSet, NewAssignment, User,
};
use crate::error::{ErrorKind, PlanAssignError, Result};
use crate::interfaces::providers::PersistenceGateway;

/// Assigns users to a plan procedure and reads the current roster back.
#[derive(Clone)]
pub struct AssignmentService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl AssignmentService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    /// Replaces every user assigned to `(plan_id, procedure_id)` with
    /// `command.user_ids`.
    ///
    /// Checks run in a fixed order: input shape, plan, procedure, then each
    /// user in input order, stopping at the first failure. Nothing is written
    /// until all checks pass, and the delete of the old set plus the insert of
    /// the new one are committed by a single gateway save. `cancel` is
    /// checked once the change set is staged; after that the save runs to
    /// completion so the result always reflects what was committed.
    pub async fn assign_users(
        &self,
        command: AssignUsersCommand,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let plan_id = command.plan_id;
        let procedure_id = command.procedure_id;

        let outcome = self.replace_assignments(command, cancel).await;

        match &outcome {
            Ok(()) => {}
            Err(err) => match err.kind() {
                ErrorKind::BadRequest | ErrorKind::NotFound => {
                    warn!(plan_id, procedure_id, error = %err, "Assignment rejected");
                }
                ErrorKind::Unhandled => {
                    error!(plan_id, procedure_id, error = %err, "Assignment failed");
                }
            },
        }
        outcome
    }

    /// Users currently assigned to `(plan_id, procedure_id)`.
    ///
    /// Unlike `assign_users` this does not check that the plan or procedure
    /// exist; an unknown pair reads as an empty roster.
    pub async fn assigned_users(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<User>> {
        self.gateway
            .assigned_users(plan_id, procedure_id)
            .await
            .map_err(unhandled)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.gateway.list_users().await.map_err(unhandled)
    }

    async fn replace_assignments(
        &self,
        command: AssignUsersCommand,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let user_ids = validate(&command)?;
        let plan_id = command.plan_id;
        let procedure_id = command.procedure_id;

        if self
            .gateway
            .find_plan(plan_id)
            .await
            .map_err(unhandled)?
            .is_none()
        {
            return Err(PlanAssignError::NotFound(format!(
                "PlanId: {plan_id} not found"
            )));
        }

        if self
            .gateway
            .find_procedure(procedure_id)
            .await
            .map_err(unhandled)?
            .is_none()
        {
            return Err(PlanAssignError::NotFound(format!(
                "ProcedureId: {procedure_id} not found"
            )));
        }

        for &user_id in &user_ids {
            if self
                .gateway
                .find_user(user_id)
                .await
                .map_err(unhandled)?
                .is_none()
            {
                return Err(PlanAssignError::NotFound(format!(
                    "UserId: {user_id} not found"
                )));
            }
        }

        let existing = self
            .gateway
            .list_assignments(plan_id, procedure_id)
            .await
            .map_err(unhandled)?;
        let removed = existing.len();

        let mut changes = AssignmentChangeSet::new();
        changes.stage_delete(existing);
        changes.stage_insert(user_ids.iter().map(|&user_id| NewAssignment {
            plan_id,
            procedure_id,
            user_id,
        }));

        if cancel.is_cancelled() {
            return Err(PlanAssignError::Cancelled);
        }
        self.gateway.save(changes).await.map_err(unhandled)?;

        info!(
            plan_id,
            procedure_id,
            removed,
            assigned = user_ids.len(),
            "Replaced procedure assignments"
        );
        Ok(())
    }
}

/// Checks the command shape and returns the user ids with repeats dropped,
/// keeping first-occurrence order.
fn validate(command: &AssignUsersCommand) -> Result<Vec<i32>> {
    if command.plan_id < 1 {
        return Err(PlanAssignError::BadRequest("Invalid PlanId".to_string()));
    }
    if command.procedure_id < 1 {
        return Err(PlanAssignError::BadRequest(
            "Invalid ProcedureId".to_string(),
        ));
    }
    let Some(user_ids) = command.user_ids.as_deref() else {
        return Err(PlanAssignError::BadRequest(
            "UserIds cannot be null".to_string(),
        ));
    };
    Ok(dedup_in_order(user_ids))
}

fn dedup_in_order(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

// Client-facing kinds only originate in this service; anything the gateway
// raises is a storage failure from the caller's point of view.
fn unhandled(err: PlanAssignError) -> PlanAssignError {
    match err.kind() {
        ErrorKind::Unhandled => err,
        ErrorKind::BadRequest | ErrorKind::NotFound => PlanAssignError::Storage(err.to_string()),
    }
}
