//! SQLite repository implementing [`RemoteStore`].
//!
//! Inserts assign canonical UUID ids; partial updates only touch the supplied columns.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Activity, Lead, LeadChanges, NewActivity, NewUserRequest, Task, TaskChanges, TaskPriority,
    TaskStatus, User, UserRole,
};
use crate::remote::RemoteStore;

const USER_COLUMNS: &str = "id, name, email, phone, role, avatar";
const LEAD_COLUMNS: &str = "id, name, email, phone, source, status, assigned_to, purpose, notes, deal_value, created_at, last_contacted";
const TASK_COLUMNS: &str =
    "id, title, lead_id, assigned_to, due_date, priority, status, created_at";

/// A stored login credential.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    hash_cost: u32,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor. Tests use the minimum of 4.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    // ==================== CREDENTIAL OPERATIONS ====================

    /// Look up a credential by (case-insensitive) email.
    pub async fn find_credential(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query(
            "SELECT user_id, email, password_hash FROM credentials WHERE email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Credential, sqlx::Error> {
            Ok(Credential {
                user_id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                password_hash: row.try_get("password_hash")?,
            })
        })
        .transpose()
        .map_err(AppError::from)
    }
}

#[async_trait]
impl RemoteStore for Repository {
    // ==================== USER OPERATIONS ====================

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM profiles ORDER BY name",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM profiles WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET name = ?, email = ?, phone = ?, role = ?, avatar = ? WHERE id = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    async fn create_user_with_password(
        &self,
        request: &NewUserRequest,
    ) -> Result<String, AppError> {
        request.validate()?;

        let id = uuid::Uuid::new_v4().to_string();
        let hash = bcrypt::hash(&request.password, self.hash_cost)?;

        // Profile and credential commit together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO profiles (id, name, email, phone, role, avatar) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(request.email.trim())
        .bind(&request.phone)
        .bind(request.role.as_str())
        .bind(request.avatar.clone().filter(|a| !a.is_empty()))
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            "INSERT INTO credentials (user_id, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind(&id)
        .bind(request.email.trim())
        .bind(&hash)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            tx.rollback().await?;
            return Err(match AppError::from(err) {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "A user with email {} already exists",
                    request.email.trim()
                )),
                other => other,
            });
        }

        tx.commit().await?;
        tracing::info!(user_id = %id, "Provisioned user");
        Ok(id)
    }

    // ==================== LEAD OPERATIONS ====================

    async fn list_leads(&self, limit: Option<usize>) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM leads ORDER BY created_at DESC LIMIT ?",
            LEAD_COLUMNS
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(lead_from_row).collect()
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(lead_from_row).transpose()
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<Lead, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(&format!(
            "INSERT INTO leads ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            LEAD_COLUMNS
        ))
        .bind(&id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(&lead.status)
        .bind(&lead.assigned_to)
        .bind(&lead.purpose)
        .bind(&lead.notes)
        .bind(lead.deal_value)
        .bind(lead.created_at)
        .bind(lead.last_contacted)
        .execute(&self.pool)
        .await?;

        Ok(Lead {
            id,
            ..lead.clone()
        })
    }

    async fn update_lead(&self, id: &str, changes: &LeadChanges) -> Result<(), AppError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE leads SET ");
        let mut columns = 0;
        {
            let mut set = qb.separated(", ");
            let text_columns = [
                ("name", &changes.name),
                ("email", &changes.email),
                ("phone", &changes.phone),
                ("source", &changes.source),
                ("status", &changes.status),
                ("assigned_to", &changes.assigned_to),
                ("purpose", &changes.purpose),
                ("notes", &changes.notes),
            ];
            for (column, value) in text_columns {
                if let Some(value) = value {
                    set.push(format!("{} = ", column));
                    set.push_bind_unseparated(value.clone());
                    columns += 1;
                }
            }
            if let Some(deal_value) = changes.deal_value {
                set.push("deal_value = ");
                set.push_bind_unseparated(deal_value);
                columns += 1;
            }
            if let Some(last_contacted) = changes.last_contacted {
                set.push("last_contacted = ");
                set.push_bind_unseparated(last_contacted);
                columns += 1;
            }
        }
        if columns == 0 {
            return Ok(());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }
        Ok(())
    }

    async fn delete_lead(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }
        Ok(())
    }

    // ==================== TASK OPERATIONS ====================

    async fn list_tasks(&self, limit: Option<usize>) -> Result<Vec<Task>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks ORDER BY created_at DESC LIMIT ?",
            TASK_COLUMNS
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn insert_task(&self, task: &Task) -> Result<Task, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(&format!(
            "INSERT INTO tasks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            TASK_COLUMNS
        ))
        .bind(&id)
        .bind(&task.title)
        .bind(&task.lead_id)
        .bind(&task.assigned_to)
        .bind(task.due_date)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.created_at)
        .execute(&self.pool)
        .await?;

        Ok(Task {
            id,
            ..task.clone()
        })
    }

    async fn update_task(&self, id: &str, changes: &TaskChanges) -> Result<(), AppError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut columns = 0;
        {
            let mut set = qb.separated(", ");
            let text_columns = [
                ("title", changes.title.clone()),
                ("lead_id", changes.lead_id.clone()),
                ("assigned_to", changes.assigned_to.clone()),
                ("priority", changes.priority.map(|p| p.as_str().to_string())),
                ("status", changes.status.map(|s| s.as_str().to_string())),
            ];
            for (column, value) in text_columns {
                if let Some(value) = value {
                    set.push(format!("{} = ", column));
                    set.push_bind_unseparated(value);
                    columns += 1;
                }
            }
            if let Some(due_date) = changes.due_date {
                set.push("due_date = ");
                set.push_bind_unseparated(due_date);
                columns += 1;
            }
        }
        if columns == 0 {
            return Ok(());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }

    // ==================== ACTIVITY OPERATIONS ====================

    async fn list_activities(&self, limit: Option<usize>) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query(
            "SELECT id, user_id, action, timestamp FROM activities ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<Activity, sqlx::Error> {
                Ok(Activity {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    action: row.try_get("action")?,
                    timestamp: row.try_get("timestamp")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(AppError::from)
    }

    async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO activities (id, user_id, action, timestamp) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&activity.user_id)
            .bind(&activity.action)
            .bind(activity.timestamp)
            .execute(&self.pool)
            .await?;

        Ok(activity.clone().into_activity(id))
    }
}

// ==================== HELPER FUNCTIONS ====================

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .and_then(|l| i64::try_from(l).ok())
        .unwrap_or(-1)
}

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unexpected {} value: {:?}", column, value).into())
}

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        role: UserRole::parse(&role).ok_or_else(|| decode_error("role", &role))?,
        avatar: row.try_get("avatar")?,
    })
}

fn lead_from_row(row: &SqliteRow) -> Result<Lead, AppError> {
    Ok(Lead {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        source: row.try_get("source")?,
        status: row.try_get("status")?,
        assigned_to: row.try_get("assigned_to")?,
        purpose: row.try_get("purpose")?,
        notes: row.try_get("notes")?,
        deal_value: row.try_get("deal_value")?,
        created_at: row.try_get("created_at")?,
        last_contacted: row.try_get("last_contacted")?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task, AppError> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        lead_id: row.try_get("lead_id")?,
        assigned_to: row.try_get("assigned_to")?,
        due_date: row.try_get("due_date")?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| decode_error("priority", &priority))?,
        status: TaskStatus::parse(&status).ok_or_else(|| decode_error("status", &status))?,
        created_at: row.try_get("created_at")?,
    })
}
