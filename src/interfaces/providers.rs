use async_trait::async_trait;

use crate::domains::assignment::{Assignment, AssignmentChangeSet, Plan, Procedure, User};
use crate::error::Result;

/// Storage seam consumed by the assignment service.
///
/// Lookups return `Ok(None)` for a missing row; `Err` is reserved for the
/// store itself failing. `save` must commit every staged change or none.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn find_plan(&self, plan_id: i32) -> Result<Option<Plan>>;
    async fn find_procedure(&self, procedure_id: i32) -> Result<Option<Procedure>>;
    async fn find_user(&self, user_id: i32) -> Result<Option<User>>;
    async fn list_assignments(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<Assignment>>;
    async fn save(&self, changes: AssignmentChangeSet) -> Result<()>;
    async fn assigned_users(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
}
