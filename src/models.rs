use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

// --- Identity ---

/// Role
///
/// The two roles the system knows about. Anything else requested at registration
/// is clamped down to `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Maps a client-requested role onto the known set. Unknown or missing values
    /// silently become `User`.
    pub fn from_requested(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

// Used by sqlx when decoding the TEXT `role` column.
impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::from_requested(Some(value.as_str()))
    }
}

/// User
///
/// The canonical identity row from the `users` table. It carries the password hash
/// and is therefore never serialized; responses go through `UserResponse`.
#[derive(Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Field changes for an existing user, after the router has decided which of them
/// the caller is allowed to make and hashed any new password.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl User {
    /// Copies exactly the mutable identity fields. `id` is never touched.
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
    }
}

/// UserResponse
///
/// The public subset of a user that may leave the process.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

/// UserCreate
///
/// Registration payload (POST /users/). `role` is optional and clamped.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserCreate {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// UserUpdate
///
/// Partial update payload for PUT /users/{id}. Only provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// LoginRequest
///
/// Credentials for POST /login (JSON) and POST /token (form encoded).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// TokenResponse
///
/// A freshly issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "bearer".
    pub token_type: String,
}

// --- Status vocabulary ---

/// Status
///
/// An admin-maintained named state (e.g. "pending", "resolved") that red flags and
/// interventions point at.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub record_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusInput {
    #[schema(example = "resolved")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl Status {
    pub fn apply(&mut self, input: StatusInput) {
        self.name = input.name;
        self.record_type = input.record_type;
    }
}

/// StatusChange
///
/// Body of the change_status routes. The status is resolved by `name`; `id` is
/// accepted for compatibility with older clients and otherwise ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[schema(example = "resolved")]
    pub name: String,
}

// --- Reports ---

/// RedFlag
///
/// A citizen-filed incident report from the `red_flags` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct RedFlag {
    pub id: i64,
    pub incident_type: String,
    pub description: String,
    pub attachments: Option<String>,
    pub additional_details: Option<String>,
    pub county: Option<String>,
    pub location: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    // Owner. Set once at creation.
    pub user_id: i64,
    pub status_id: i64,
}

/// RedFlagInput
///
/// Client-editable red flag fields, used by both POST and PUT. There is no `id`,
/// `user_id` or `status_id` here: the server owns those.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct RedFlagInput {
    #[schema(example = "bribery")]
    pub incident_type: String,
    pub description: String,
    #[serde(default)]
    pub attachments: Option<String>,
    #[serde(default)]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[schema(example = "-1.2921,36.8219")]
    pub location: String,
}

impl RedFlag {
    /// Replaces the client-editable fields. Identity, ownership, status and the
    /// report date are left alone.
    pub fn apply(&mut self, input: RedFlagInput) {
        self.incident_type = input.incident_type;
        self.description = input.description;
        self.attachments = input.attachments;
        self.additional_details = input.additional_details;
        self.county = input.county;
        self.location = input.location;
    }

    pub fn relocate(&mut self, geo: Geolocation) {
        self.county = Some(geo.county);
        self.location = geo.location;
    }
}

/// Intervention
///
/// A citizen-filed request for government action. Deleting one stamps
/// `deleted_by`/`deleted_at` instead of removing the row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Intervention {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub attachments: Option<String>,
    pub additional_details: Option<String>,
    pub county: Option<String>,
    pub location: String,
    pub user_id: i64,
    pub status_id: i64,
    pub deleted_by: Option<i64>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct InterventionInput {
    #[schema(example = "Repair the Kisumu-Busia bridge")]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub attachments: Option<String>,
    #[serde(default)]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    pub location: String,
}

impl Intervention {
    pub fn apply(&mut self, input: InterventionInput) {
        self.title = input.title;
        self.description = input.description;
        self.attachments = input.attachments;
        self.additional_details = input.additional_details;
        self.county = input.county;
        self.location = input.location;
    }

    pub fn relocate(&mut self, geo: Geolocation) {
        self.county = Some(geo.county);
        self.location = geo.location;
    }

    pub fn soft_delete(&mut self, deleted_by: i64, at: DateTime<Utc>) {
        self.deleted_by = Some(deleted_by);
        self.deleted_at = Some(at);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Geolocation
///
/// Body of the update_location routes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Geolocation {
    pub county: String,
    pub location: String,
}

/// RecordRef
///
/// Points at one red flag or one intervention. Media rows and tags hang off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    RedFlag(i64),
    Intervention(i64),
}

impl RecordRef {
    pub fn id(&self) -> i64 {
        match self {
            RecordRef::RedFlag(id) | RecordRef::Intervention(id) => *id,
        }
    }

    /// Column holding the parent id in child tables.
    pub fn column(&self) -> &'static str {
        match self {
            RecordRef::RedFlag(_) => "red_flag_id",
            RecordRef::Intervention(_) => "intervention_id",
        }
    }

    /// Prefix used in audit `action` strings and notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            RecordRef::RedFlag(_) => "red_flag",
            RecordRef::Intervention(_) => "intervention",
        }
    }
}

// --- Attachments ---

/// Which media table a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn table(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

/// Media
///
/// One row of `images` or `videos`. Exactly one of the parent ids is set. The file
/// itself lives elsewhere; `file_path` is opaque to this service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Media {
    pub id: i64,
    pub red_flag_id: Option<i64>,
    pub intervention_id: Option<i64>,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MediaInput {
    #[schema(example = "uploads/2023/11/bridge.jpg")]
    pub file_path: String,
}

/// Tag
///
/// Links a red flag to an intervention.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Tag {
    pub id: i64,
    pub red_flag_id: i64,
    pub intervention_id: i64,
}

/// Body of POST /red_flags/{id}/tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TagInterventionRequest {
    pub intervention_id: i64,
}

/// Body of POST /interventions/{id}/tags.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TagRedFlagRequest {
    pub red_flag_id: i64,
}

// --- Notifications & audit ---

/// Notification
///
/// A stored message for one user. Nothing here delivers it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub is_email: bool,
    pub is_sms: bool,
}

/// NotificationCreate
///
/// A notification about to be stored, either from POST /notifications/ or emitted
/// by a status change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct NotificationCreate {
    pub user_id: i64,
    pub message: String,
    #[serde(default)]
    pub is_email: bool,
    #[serde(default)]
    pub is_sms: bool,
}

impl NotificationCreate {
    /// A plain in-app notification.
    pub fn in_app(user_id: i64, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            is_email: false,
            is_sms: false,
        }
    }
}

/// AdminAction
///
/// Audit row written whenever an administrator performs a privileged mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct AdminAction {
    pub id: i64,
    // The acting administrator.
    pub user_id: i64,
    pub record_id: i64,
    #[schema(example = "red_flag.change_status:resolved")]
    pub action: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

/// An audit entry about to be written. The registry fills in `record_id` with the
/// id of the row the mutation touched.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub admin_id: i64,
    pub action: String,
}

// --- Misc ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// Page
///
/// `skip`/`limit` pagination accepted by every list route.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Page {
    /// Rows to skip.
    #[serde(default)]
    pub skip: i64,
    /// Maximum number of rows to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.max(0)
    }
}
