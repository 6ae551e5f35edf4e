use crate::{
    models::{
        AdminAction, Intervention, InterventionInput, Media, MediaKind, Notification,
        NotificationCreate, Page, RecordRef, RedFlag, RedFlagInput, Status, StatusInput, Tag,
        User,
    },
    repository::{Effects, NewUser, RepoError, RepoResult, Repository},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

/// Statuses every fresh registry starts with, mirroring the initial migration.
pub const SEEDED_STATUSES: [&str; 4] = ["pending", "under investigation", "rejected", "resolved"];

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    statuses: Vec<Status>,
    red_flags: Vec<RedFlag>,
    interventions: Vec<Intervention>,
    images: Vec<Media>,
    videos: Vec<Media>,
    tags: Vec<Tag>,
    notifications: Vec<Notification>,
    admin_actions: Vec<AdminAction>,
}

impl Tables {
    // One sequence shared by all tables keeps ids unique and increasing.
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn media(&mut self, kind: MediaKind) -> &mut Vec<Media> {
        match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
        }
    }

    fn apply_effects(&mut self, record_id: i64, effects: Effects) {
        if let Some(entry) = effects.audit {
            let id = self.next_id();
            tracing::info!(admin_id = entry.admin_id, record_id, action = %entry.action, "admin action recorded");
            self.admin_actions.push(AdminAction {
                id,
                user_id: entry.admin_id,
                record_id,
                action: entry.action,
                timestamp: Utc::now(),
            });
        }
        if let Some(notification) = effects.notification {
            let id = self.next_id();
            self.notifications.push(Notification {
                id,
                user_id: notification.user_id,
                message: notification.message,
                is_email: notification.is_email,
                is_sms: notification.is_sms,
            });
        }
    }
}

fn paginate<T: Clone>(rows: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    rows.skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

/// InMemoryRepository
///
/// A process-local `Repository` used by the test suite and by local runs without a
/// database. All tables sit behind a single mutex, so each call is atomic, and the
/// lock is never held across an `.await`.
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// A registry seeded with the default status vocabulary.
    pub fn new() -> Self {
        let repo = Self::empty();
        {
            let mut tables = repo.lock();
            for name in SEEDED_STATUSES {
                let id = tables.next_id();
                tables.statuses.push(Status {
                    id,
                    name: name.to_string(),
                    record_type: None,
                });
            }
        }
        repo
    }

    /// A registry with no rows at all, not even statuses.
    pub fn empty() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn username_or_email_taken(tables: &Tables, except: Option<i64>, username: &str, email: &str) -> bool {
    tables
        .users
        .iter()
        .filter(|u| Some(u.id) != except)
        .any(|u| u.username == username || u.email == email)
}

fn missing(what: &str, id: i64) -> RepoError {
    RepoError::Database(sqlx::Error::Protocol(format!("{what} {id} does not exist")))
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.lock();
        if username_or_email_taken(&tables, None, &user.username, &user.email) {
            return Err(RepoError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        let created = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self, page: Page) -> RepoResult<Vec<User>> {
        Ok(paginate(self.lock().users.iter().cloned(), page))
    }

    async fn update_user(&self, user: &User, effects: Effects) -> RepoResult<User> {
        let mut tables = self.lock();
        if username_or_email_taken(&tables, Some(user.id), &user.username, &user.email) {
            return Err(RepoError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }
        let row = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| missing("user", user.id))?;
        *row = user.clone();
        tables.apply_effects(user.id, effects);
        Ok(user.clone())
    }

    async fn create_status(&self, input: StatusInput, effects: Effects) -> RepoResult<Status> {
        let mut tables = self.lock();
        let status = Status {
            id: tables.next_id(),
            name: input.name,
            record_type: input.record_type,
        };
        tables.statuses.push(status.clone());
        tables.apply_effects(status.id, effects);
        Ok(status)
    }

    async fn get_status(&self, id: i64) -> RepoResult<Option<Status>> {
        Ok(self.lock().statuses.iter().find(|s| s.id == id).cloned())
    }

    async fn find_status_by_name(&self, name: &str) -> RepoResult<Option<Status>> {
        Ok(self
            .lock()
            .statuses
            .iter()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list_statuses(&self, page: Page) -> RepoResult<Vec<Status>> {
        Ok(paginate(self.lock().statuses.iter().cloned(), page))
    }

    async fn update_status(&self, status: &Status, effects: Effects) -> RepoResult<Status> {
        let mut tables = self.lock();
        let row = tables
            .statuses
            .iter_mut()
            .find(|s| s.id == status.id)
            .ok_or_else(|| missing("status", status.id))?;
        *row = status.clone();
        tables.apply_effects(status.id, effects);
        Ok(status.clone())
    }

    async fn create_red_flag(
        &self,
        input: RedFlagInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<RedFlag> {
        let mut tables = self.lock();
        let flag = RedFlag {
            id: tables.next_id(),
            incident_type: input.incident_type,
            description: input.description,
            attachments: input.attachments,
            additional_details: input.additional_details,
            county: input.county,
            location: input.location,
            date: Utc::now(),
            user_id,
            status_id,
        };
        tables.red_flags.push(flag.clone());
        Ok(flag)
    }

    async fn get_red_flag(&self, id: i64) -> RepoResult<Option<RedFlag>> {
        Ok(self.lock().red_flags.iter().find(|f| f.id == id).cloned())
    }

    async fn list_red_flags(&self, page: Page) -> RepoResult<Vec<RedFlag>> {
        Ok(paginate(self.lock().red_flags.iter().cloned(), page))
    }

    async fn save_red_flag(&self, flag: &RedFlag, effects: Effects) -> RepoResult<RedFlag> {
        let mut tables = self.lock();
        let row = tables
            .red_flags
            .iter_mut()
            .find(|f| f.id == flag.id)
            .ok_or_else(|| missing("red flag", flag.id))?;
        // Same column set as the SQL UPDATE: owner and date stay as stored.
        let saved = RedFlag {
            user_id: row.user_id,
            date: row.date,
            ..flag.clone()
        };
        *row = saved.clone();
        tables.apply_effects(saved.id, effects);
        Ok(saved)
    }

    async fn delete_red_flag(&self, id: i64, effects: Effects) -> RepoResult<bool> {
        let mut tables = self.lock();
        let before = tables.red_flags.len();
        tables.red_flags.retain(|f| f.id != id);
        if tables.red_flags.len() == before {
            return Ok(false);
        }
        tables.images.retain(|m| m.red_flag_id != Some(id));
        tables.videos.retain(|m| m.red_flag_id != Some(id));
        tables.tags.retain(|t| t.red_flag_id != id);
        tables.apply_effects(id, effects);
        Ok(true)
    }

    async fn create_intervention(
        &self,
        input: InterventionInput,
        user_id: i64,
        status_id: i64,
    ) -> RepoResult<Intervention> {
        let mut tables = self.lock();
        let intervention = Intervention {
            id: tables.next_id(),
            title: input.title,
            description: input.description,
            attachments: input.attachments,
            additional_details: input.additional_details,
            county: input.county,
            location: input.location,
            user_id,
            status_id,
            deleted_by: None,
            deleted_at: None,
        };
        tables.interventions.push(intervention.clone());
        Ok(intervention)
    }

    async fn get_intervention(&self, id: i64) -> RepoResult<Option<Intervention>> {
        Ok(self
            .lock()
            .interventions
            .iter()
            .find(|i| i.id == id && !i.is_deleted())
            .cloned())
    }

    async fn list_interventions(&self, page: Page) -> RepoResult<Vec<Intervention>> {
        Ok(paginate(
            self.lock()
                .interventions
                .iter()
                .filter(|i| !i.is_deleted())
                .cloned(),
            page,
        ))
    }

    async fn save_intervention(
        &self,
        intervention: &Intervention,
        effects: Effects,
    ) -> RepoResult<Intervention> {
        let mut tables = self.lock();
        let row = tables
            .interventions
            .iter_mut()
            .find(|i| i.id == intervention.id)
            .ok_or_else(|| missing("intervention", intervention.id))?;
        let saved = Intervention {
            user_id: row.user_id,
            ..intervention.clone()
        };
        *row = saved.clone();
        tables.apply_effects(saved.id, effects);
        Ok(saved)
    }

    async fn add_media(
        &self,
        kind: MediaKind,
        parent: RecordRef,
        file_path: String,
        effects: Effects,
    ) -> RepoResult<Media> {
        let mut tables = self.lock();
        let (red_flag_id, intervention_id) = match parent {
            RecordRef::RedFlag(id) => (Some(id), None),
            RecordRef::Intervention(id) => (None, Some(id)),
        };
        let media = Media {
            id: tables.next_id(),
            red_flag_id,
            intervention_id,
            file_path,
        };
        tables.media(kind).push(media.clone());
        tables.apply_effects(media.id, effects);
        Ok(media)
    }

    async fn list_media(&self, kind: MediaKind, parent: RecordRef) -> RepoResult<Vec<Media>> {
        let mut tables = self.lock();
        Ok(tables
            .media(kind)
            .iter()
            .filter(|m| match parent {
                RecordRef::RedFlag(id) => m.red_flag_id == Some(id),
                RecordRef::Intervention(id) => m.intervention_id == Some(id),
            })
            .cloned()
            .collect())
    }

    async fn create_tag(
        &self,
        red_flag_id: i64,
        intervention_id: i64,
        effects: Effects,
    ) -> RepoResult<Tag> {
        let mut tables = self.lock();
        let tag = Tag {
            id: tables.next_id(),
            red_flag_id,
            intervention_id,
        };
        tables.tags.push(tag.clone());
        tables.apply_effects(tag.id, effects);
        Ok(tag)
    }

    async fn list_tags(&self, parent: RecordRef) -> RepoResult<Vec<Tag>> {
        let tables = self.lock();
        let live = |intervention_id: i64| {
            tables
                .interventions
                .iter()
                .any(|i| i.id == intervention_id && !i.is_deleted())
        };
        Ok(tables
            .tags
            .iter()
            .filter(|t| match parent {
                RecordRef::RedFlag(id) => t.red_flag_id == id,
                RecordRef::Intervention(id) => t.intervention_id == id,
            })
            .filter(|t| live(t.intervention_id))
            .cloned()
            .collect())
    }

    async fn create_notification(
        &self,
        notification: NotificationCreate,
        effects: Effects,
    ) -> RepoResult<Notification> {
        let mut tables = self.lock();
        let created = Notification {
            id: tables.next_id(),
            user_id: notification.user_id,
            message: notification.message,
            is_email: notification.is_email,
            is_sms: notification.is_sms,
        };
        tables.notifications.push(created.clone());
        tables.apply_effects(created.id, effects);
        Ok(created)
    }

    async fn list_notifications(&self, user_id: i64, page: Page) -> RepoResult<Vec<Notification>> {
        Ok(paginate(
            self.lock()
                .notifications
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned(),
            page,
        ))
    }

    async fn list_admin_actions(&self, page: Page) -> RepoResult<Vec<AdminAction>> {
        Ok(paginate(self.lock().admin_actions.iter().cloned(), page))
    }
}
