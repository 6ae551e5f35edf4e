use crate::models::{
    AdminAction, AuditEntry, Intervention, InterventionInput, Media, MediaKind, Notification,
    NotificationCreate, Page, RecordRef, RedFlag, RedFlagInput, Role, Status, StatusInput, Tag,
    User,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

/// RepoError
///
/// Failures the registry reports. Unique-key violations are singled out so the router
/// can answer them as a client error.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Effects
///
/// Rows that must be committed together with a mutation: an audit entry when an admin
/// acted, and a notification for the record owner. The registry writes them in the
/// same transaction as the mutation itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub audit: Option<AuditEntry>,
    pub notification: Option<NotificationCreate>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn audited(mut self, audit: Option<AuditEntry>) -> Self {
        self.audit = audit;
        self
    }

    pub fn notify(mut self, notification: NotificationCreate) -> Self {
        self.notification = Some(notification);
        self
    }
}

/// A user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Repository Trait
///
/// The record registry: plain create/read/update/delete per table, keyed by primary
/// key. It performs no content validation and no authorization; both belong to the
/// router and `policy`.
///
/// List operations return rows in insertion (id) order.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>>;
    async fn update_user(&self, user: &User, effects: Effects) -> RepoResult<User>;

    // --- Statuses ---
    async fn create_status(&self, input: StatusInput, effects: Effects) -> RepoResult<Status>;
    async fn get_status(&self, id: i64) -> RepoResult<Option<Status>>;
    // Lowest id wins when a name appears more than once.
    async fn find_status_by_name(&self, name: &str) -> RepoResult<Option<Status>>;
    async fn list_statuses(&self, page: Page) -> RepoResult<Vec<Status>>;
    async fn update_status(&self, status: &Status, effects: Effects) -> RepoResult<Status>;

    // --- Red flags ---
    async fn create_red_flag(
        &self,
        input: RedFlagInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<RedFlag>;
    async fn get_red_flag(&self, id: i64) -> RepoResult<Option<RedFlag>>;
    async fn list_red_flags(&self, page: Page) -> RepoResult<Vec<RedFlag>>;
    /// Writes every mutable column of `flag` back.
    async fn save_red_flag(&self, flag: &RedFlag, effects: Effects) -> RepoResult<RedFlag>;
    /// Hard delete. Returns false when no row matched.
    async fn delete_red_flag(&self, id: i64, effects: Effects) -> RepoResult<bool>;

    // --- Interventions ---
    async fn create_intervention(
        &self,
        input: InterventionInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<Intervention>;
    /// Soft-deleted interventions are invisible to reads.
    async fn get_intervention(&self, id: i64) -> RepoResult<Option<Intervention>>;
    async fn list_interventions(&self, page: Page) -> RepoResult<Vec<Intervention>>;
    /// Also used for soft deletion: the caller stamps `deleted_by`/`deleted_at` first.
    async fn save_intervention(
        &self,
        intervention: &Intervention,
        effects: Effects,
    ) -> RepoResult<Intervention>;

    // --- Attachments ---
    async fn add_media(
        &self,
        kind: MediaKind,
        parent: RecordRef,
        file_path: String,
        effects: Effects,
    ) -> RepoResult<Media>;
    async fn list_media(&self, kind: MediaKind, parent: RecordRef) -> RepoResult<Vec<Media>>;
    async fn create_tag(
        &self,
        red_flag_id: i64,
        intervention_id: i64,
        effects: Effects,
    ) -> RepoResult<Tag>;
    async fn list_tags(&self, parent: RecordRef) -> RepoResult<Vec<Tag>>;

    // --- Notifications & audit ---
    async fn create_notification(
        &self,
        notification: NotificationCreate,
        effects: Effects,
    ) -> RepoResult<Notification>;
    async fn list_notifications(&self, user_id: i64, page: Page) -> RepoResult<Vec<Notification>>;
    async fn list_admin_actions(&self, page: Page) -> RepoResult<Vec<AdminAction>>;
}

/// RepositoryState
///
/// The shared handle to the registry held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Every mutation runs in its own transaction
/// together with its `Effects`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role";
const RED_FLAG_COLUMNS: &str = "id, incident_type, description, attachments, additional_details, county, location, date, user_id, status_id";
const INTERVENTION_COLUMNS: &str = "id, title, description, attachments, additional_details, county, location, user_id, status_id, deleted_by, deleted_at";

/// Turns a unique-key violation into `RepoError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepoError::Conflict(message.to_string())
        }
        _ => RepoError::Database(err),
    }
}

/// Writes the audit row and the notification attached to a mutation of `record_id`.
async fn apply_effects(
    tx: &mut Transaction<'_, Postgres>,
    record_id: i64,
    effects: Effects,
) -> RepoResult<()> {
    if let Some(entry) = effects.audit {
        sqlx::query(
            "INSERT INTO admin_actions (user_id, record_id, action, timestamp) VALUES ($1, $2, $3, NOW())",
        )
        .bind(entry.admin_id)
        .bind(record_id)
        .bind(&entry.action)
        .execute(&mut **tx)
        .await?;
        tracing::info!(admin_id = entry.admin_id, record_id, action = %entry.action, "admin action recorded");
    }

    if let Some(notification) = effects.notification {
        sqlx::query(
            "INSERT INTO notifications (user_id, message, is_email, is_sms) VALUES ($1, $2, $3, $4)",
        )
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.is_email)
        .bind(notification.is_sms)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already registered"))
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_user(&self, user: &User, effects: Effects) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, role = $5 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already registered"))?;
        apply_effects(&mut tx, updated.id, effects).await?;
        tx.commit().await?;
        Ok(updated)
    }

    // --- STATUSES ---

    async fn create_status(&self, input: StatusInput, effects: Effects) -> RepoResult<Status> {
        let mut tx = self.pool.begin().await?;
        let status = sqlx::query_as::<_, Status>(
            "INSERT INTO statuses (name, record_type) VALUES ($1, $2) RETURNING id, name, record_type",
        )
        .bind(&input.name)
        .bind(&input.record_type)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, status.id, effects).await?;
        tx.commit().await?;
        Ok(status)
    }

    async fn get_status(&self, id: i64) -> RepoResult<Option<Status>> {
        Ok(sqlx::query_as::<_, Status>(
            "SELECT id, name, record_type FROM statuses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_status_by_name(&self, name: &str) -> RepoResult<Option<Status>> {
        Ok(sqlx::query_as::<_, Status>(
            "SELECT id, name, record_type FROM statuses WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_statuses(&self, page: Page) -> RepoResult<Vec<Status>> {
        Ok(sqlx::query_as::<_, Status>(
            "SELECT id, name, record_type FROM statuses ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_status(&self, status: &Status, effects: Effects) -> RepoResult<Status> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Status>(
            "UPDATE statuses SET name = $2, record_type = $3 WHERE id = $1 RETURNING id, name, record_type",
        )
        .bind(status.id)
        .bind(&status.name)
        .bind(&status.record_type)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, updated.id, effects).await?;
        tx.commit().await?;
        Ok(updated)
    }

    // --- RED FLAGS ---

    async fn create_red_flag(
        &self,
        input: RedFlagInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<RedFlag> {
        Ok(sqlx::query_as::<_, RedFlag>(&format!(
            r#"INSERT INTO red_flags
                (incident_type, description, attachments, additional_details, county, location, date, user_id, status_id)
               VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7, $8)
               RETURNING {RED_FLAG_COLUMNS}"#
        ))
        .bind(&input.incident_type)
        .bind(&input.description)
        .bind(&input.attachments)
        .bind(&input.additional_details)
        .bind(&input.county)
        .bind(&input.location)
        .bind(user_id)
        .bind(status_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_red_flag(&self, id: i64) -> RepoResult<Option<RedFlag>> {
        Ok(sqlx::query_as::<_, RedFlag>(&format!(
            "SELECT {RED_FLAG_COLUMNS} FROM red_flags WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_red_flags(&self, page: Page) -> RepoResult<Vec<RedFlag>> {
        Ok(sqlx::query_as::<_, RedFlag>(&format!(
            "SELECT {RED_FLAG_COLUMNS} FROM red_flags ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_red_flag(&self, flag: &RedFlag, effects: Effects) -> RepoResult<RedFlag> {
        let mut tx = self.pool.begin().await?;
        // user_id and date are deliberately absent from the SET list.
        let saved = sqlx::query_as::<_, RedFlag>(&format!(
            r#"UPDATE red_flags
               SET incident_type = $2, description = $3, attachments = $4,
                   additional_details = $5, county = $6, location = $7, status_id = $8
               WHERE id = $1
               RETURNING {RED_FLAG_COLUMNS}"#
        ))
        .bind(flag.id)
        .bind(&flag.incident_type)
        .bind(&flag.description)
        .bind(&flag.attachments)
        .bind(&flag.additional_details)
        .bind(&flag.county)
        .bind(&flag.location)
        .bind(flag.status_id)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, saved.id, effects).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete_red_flag(&self, id: i64, effects: Effects) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM red_flags WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        if deleted {
            apply_effects(&mut tx, id, effects).await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }

    // --- INTERVENTIONS ---

    async fn create_intervention(
        &self,
        input: InterventionInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<Intervention> {
        Ok(sqlx::query_as::<_, Intervention>(&format!(
            r#"INSERT INTO interventions
                (title, description, attachments, additional_details, county, location, user_id, status_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {INTERVENTION_COLUMNS}"#
        ))
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.attachments)
        .bind(&input.additional_details)
        .bind(&input.county)
        .bind(&input.location)
        .bind(user_id)
        .bind(status_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_intervention(&self, id: i64) -> RepoResult<Option<Intervention>> {
        Ok(sqlx::query_as::<_, Intervention>(&format!(
            "SELECT {INTERVENTION_COLUMNS} FROM interventions WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_interventions(&self, page: Page) -> RepoResult<Vec<Intervention>> {
        Ok(sqlx::query_as::<_, Intervention>(&format!(
            "SELECT {INTERVENTION_COLUMNS} FROM interventions WHERE deleted_at IS NULL ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn save_intervention(
        &self,
        intervention: &Intervention,
        effects: Effects,
    ) -> RepoResult<Intervention> {
        let mut tx = self.pool.begin().await?;
        let saved = sqlx::query_as::<_, Intervention>(&format!(
            r#"UPDATE interventions
               SET title = $2, description = $3, attachments = $4, additional_details = $5,
                   county = $6, location = $7, status_id = $8, deleted_by = $9, deleted_at = $10
               WHERE id = $1
               RETURNING {INTERVENTION_COLUMNS}"#
        ))
        .bind(intervention.id)
        .bind(&intervention.title)
        .bind(&intervention.description)
        .bind(&intervention.attachments)
        .bind(&intervention.additional_details)
        .bind(&intervention.county)
        .bind(&intervention.location)
        .bind(intervention.status_id)
        .bind(intervention.deleted_by)
        .bind(intervention.deleted_at)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, saved.id, effects).await?;
        tx.commit().await?;
        Ok(saved)
    }

    // --- ATTACHMENTS ---

    async fn add_media(
        &self,
        kind: MediaKind,
        parent: RecordRef,
        file_path: String,
        effects: Effects,
    ) -> RepoResult<Media> {
        let mut tx = self.pool.begin().await?;
        // Table and column names come from closed enums, never from input.
        let media = sqlx::query_as::<_, Media>(&format!(
            "INSERT INTO {} ({}, file_path) VALUES ($1, $2) RETURNING id, red_flag_id, intervention_id, file_path",
            kind.table(),
            parent.column(),
        ))
        .bind(parent.id())
        .bind(&file_path)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, media.id, effects).await?;
        tx.commit().await?;
        Ok(media)
    }

    async fn list_media(&self, kind: MediaKind, parent: RecordRef) -> RepoResult<Vec<Media>> {
        Ok(sqlx::query_as::<_, Media>(&format!(
            "SELECT id, red_flag_id, intervention_id, file_path FROM {} WHERE {} = $1 ORDER BY id",
            kind.table(),
            parent.column(),
        ))
        .bind(parent.id())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_tag(
        &self,
        red_flag_id: i64,
        intervention_id: i64,
        effects: Effects,
    ) -> RepoResult<Tag> {
        let mut tx = self.pool.begin().await?;
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (red_flag_id, intervention_id) VALUES ($1, $2) RETURNING id, red_flag_id, intervention_id",
        )
        .bind(red_flag_id)
        .bind(intervention_id)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, tag.id, effects).await?;
        tx.commit().await?;
        Ok(tag)
    }

    async fn list_tags(&self, parent: RecordRef) -> RepoResult<Vec<Tag>> {
        // Links to soft-deleted interventions are hidden like the interventions themselves.
        Ok(sqlx::query_as::<_, Tag>(&format!(
            "SELECT t.id, t.red_flag_id, t.intervention_id FROM tags t \
             JOIN interventions i ON i.id = t.intervention_id \
             WHERE t.{} = $1 AND i.deleted_at IS NULL ORDER BY t.id",
            parent.column(),
        ))
        .bind(parent.id())
        .fetch_all(&self.pool)
        .await?)
    }

    // --- NOTIFICATIONS & AUDIT ---

    async fn create_notification(
        &self,
        notification: NotificationCreate,
        effects: Effects,
    ) -> RepoResult<Notification> {
        let mut tx = self.pool.begin().await?;
        let created = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, message, is_email, is_sms) VALUES ($1, $2, $3, $4) RETURNING id, user_id, message, is_email, is_sms",
        )
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.is_email)
        .bind(notification.is_sms)
        .fetch_one(&mut *tx)
        .await?;
        apply_effects(&mut tx, created.id, effects).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn list_notifications(&self, user_id: i64, page: Page) -> RepoResult<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, message, is_email, is_sms FROM notifications WHERE user_id = $1 ORDER BY id OFFSET $2 LIMIT $3",
        )
        .bind(user_id)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_admin_actions(&self, page: Page) -> RepoResult<Vec<AdminAction>> {
        Ok(sqlx::query_as::<_, AdminAction>(
            "SELECT id, user_id, record_id, action, timestamp FROM admin_actions ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await?)
    }
}
