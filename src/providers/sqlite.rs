use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::domains::assignment::{Assignment, AssignmentChangeSet, Plan, Procedure, User};
use crate::error::{PlanAssignError, Result};
use crate::interfaces::providers::PersistenceGateway;

mod schema;
use schema::{plan_procedure_users, plans, procedures, users};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

#[derive(Queryable)]
struct PlanRow {
    plan_id: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Queryable)]
struct ProcedureRow {
    procedure_id: i32,
    procedure_title: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Queryable)]
struct UserRow {
    user_id: i32,
    name: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Queryable)]
struct AssignmentRow {
    plan_id: i32,
    procedure_id: i32,
    user_id: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = plans)]
struct NewPlan {
    plan_id: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = procedures)]
struct NewProcedure<'a> {
    procedure_id: i32,
    procedure_title: &'a str,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    user_id: i32,
    name: &'a str,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = plan_procedure_users)]
struct NewAssignmentRow {
    plan_id: i32,
    procedure_id: i32,
    user_id: i32,
    created_at: i64,
    updated_at: i64,
}

/// SQLite-backed gateway. Each `save` runs inside one transaction, so a
/// failed insert rolls back the deletes staged alongside it.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
    busy_timeout_ms: u64,
}

impl SqliteGateway {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let sqlite_path = config.sqlite_path.as_str();
        if crate::db::is_in_memory(sqlite_path) {
            return Err(PlanAssignError::Config(format!(
                "sqlite_path must name a database file, got {sqlite_path:?}"
            )));
        }
        crate::db::ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path, config.busy_timeout_ms).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .max_size(config.max_connections.max(1))
            .build(manager)
            .await
            .map_err(|e| PlanAssignError::Storage(e.to_string()))?;
        debug!(sqlite_path, "Opened assignment store");
        Ok(Self {
            pool,
            busy_timeout_ms: config.busy_timeout_ms,
        })
    }

    pub async fn open(sqlite_path: impl Into<String>) -> Result<Self> {
        Self::new(&DatabaseConfig::new(sqlite_path)).await
    }

    pub async fn create_plan(&self, plan_id: i32) -> Result<Plan> {
        let now = now_ts();
        let mut conn = self.conn().await?;
        diesel::insert_into(plans::table)
            .values(&NewPlan {
                plan_id,
                created_at: now,
                updated_at: now,
            })
            .execute(&mut conn)
            .await?;
        Ok(Plan {
            plan_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn create_procedure(&self, procedure_id: i32, title: &str) -> Result<Procedure> {
        let now = now_ts();
        let mut conn = self.conn().await?;
        diesel::insert_into(procedures::table)
            .values(&NewProcedure {
                procedure_id,
                procedure_title: title,
                created_at: now,
                updated_at: now,
            })
            .execute(&mut conn)
            .await?;
        Ok(Procedure {
            procedure_id,
            procedure_title: title.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn create_user(&self, user_id: i32, name: &str) -> Result<User> {
        let now = now_ts();
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&NewUser {
                user_id,
                name,
                created_at: now,
                updated_at: now,
            })
            .execute(&mut conn)
            .await?;
        Ok(User {
            user_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| PlanAssignError::Storage(e.to_string()))?;
        crate::db::apply_pragmas_async(&mut conn, self.busy_timeout_ms).await?;
        Ok(conn)
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn find_plan(&self, plan_id: i32) -> Result<Option<Plan>> {
        let mut conn = self.conn().await?;
        let row: Option<PlanRow> = plans::table
            .find(plan_id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(|row| Plan {
            plan_id: row.plan_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn find_procedure(&self, procedure_id: i32) -> Result<Option<Procedure>> {
        let mut conn = self.conn().await?;
        let row: Option<ProcedureRow> = procedures::table
            .find(procedure_id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(|row| Procedure {
            procedure_id: row.procedure_id,
            procedure_title: row.procedure_title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn find_user(&self, user_id: i32) -> Result<Option<User>> {
        let mut conn = self.conn().await?;
        let row: Option<UserRow> = users::table
            .find(user_id)
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(map_user))
    }

    async fn list_assignments(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<Assignment>> {
        let mut conn = self.conn().await?;
        let rows: Vec<AssignmentRow> = plan_procedure_users::table
            .filter(plan_procedure_users::plan_id.eq(plan_id))
            .filter(plan_procedure_users::procedure_id.eq(procedure_id))
            .order(plan_procedure_users::user_id.asc())
            .load(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Assignment {
                plan_id: row.plan_id,
                procedure_id: row.procedure_id,
                user_id: row.user_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn save(&self, changes: AssignmentChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let now = now_ts();
        let (deletes, inserts) = changes.into_parts();
        let (delete_count, insert_count) = (deletes.len(), inserts.len());

        let mut conn = self.conn().await?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                for row in &deletes {
                    diesel::delete(
                        plan_procedure_users::table
                            .filter(plan_procedure_users::plan_id.eq(row.plan_id))
                            .filter(plan_procedure_users::procedure_id.eq(row.procedure_id))
                            .filter(plan_procedure_users::user_id.eq(row.user_id)),
                    )
                    .execute(conn)
                    .await?;
                }
                for row in &inserts {
                    diesel::insert_into(plan_procedure_users::table)
                        .values(&NewAssignmentRow {
                            plan_id: row.plan_id,
                            procedure_id: row.procedure_id,
                            user_id: row.user_id,
                            created_at: now,
                            updated_at: now,
                        })
                        .execute(conn)
                        .await?;
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        debug!(
            deleted = delete_count,
            inserted = insert_count,
            "Committed assignment change set"
        );
        Ok(())
    }

    async fn assigned_users(&self, plan_id: i32, procedure_id: i32) -> Result<Vec<User>> {
        let mut conn = self.conn().await?;
        let rows: Vec<UserRow> = plan_procedure_users::table
            .inner_join(users::table)
            .filter(plan_procedure_users::plan_id.eq(plan_id))
            .filter(plan_procedure_users::procedure_id.eq(procedure_id))
            .select((
                users::user_id,
                users::name,
                users::created_at,
                users::updated_at,
            ))
            .order(users::user_id.asc())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_user).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut conn = self.conn().await?;
        let rows: Vec<UserRow> = users::table
            .order(users::user_id.asc())
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_user).collect())
    }
}

fn map_user(row: UserRow) -> User {
    User {
        user_id: row.user_id,
        name: row.name,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

async fn run_migrations(database_url: &str, busy_timeout_ms: u64) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = crate::db::open_connection_sync(&database_url, busy_timeout_ms)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| PlanAssignError::Storage(e.to_string()))?;
        Ok::<_, PlanAssignError>(())
    })
    .await
    .map_err(|e| PlanAssignError::Runtime(e.to_string()))??;
    Ok(())
}

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
