use chrono::Utc;
use redflag_api::{
    InMemoryRepository,
    memory::SEEDED_STATUSES,
    models::{
        AuditEntry, InterventionInput, MediaKind, NotificationCreate, Page, RecordRef,
        RedFlagInput, Role, StatusInput,
    },
    repository::{Effects, NewUser, PostgresRepository, RepoError, Repository},
};
use sqlx::PgPool;

// --- Test Context and Setup ---

/// Connects to `DATABASE_URL` and applies the migrations.
async fn postgres() -> PostgresRepository {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");

    let pool = PgPool::connect(&db_url)
        .await
        .expect("Failed to connect to database for integration tests.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    PostgresRepository::new(pool)
}

// --- Test Data Helpers ---

/// Names that do not collide across runs against a shared database.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn new_user(username: &str, role: Role) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "$argon2id$stub".to_string(),
        role,
    }
}

fn red_flag_input() -> RedFlagInput {
    RedFlagInput {
        incident_type: "bribery".to_string(),
        description: "cash at the roadblock".to_string(),
        location: "Thika Road".to_string(),
        ..RedFlagInput::default()
    }
}

fn intervention_input() -> InterventionInput {
    InterventionInput {
        title: "Clear the drainage".to_string(),
        description: "Flooding every April".to_string(),
        location: "Kisumu".to_string(),
        ..InterventionInput::default()
    }
}

// --- Shared contract ---

async fn users_are_unique(repo: &dyn Repository) {
    let name = unique("alice");
    let alice = repo.create_user(new_user(&name, Role::User)).await.unwrap();

    let duplicate = repo.create_user(new_user(&name, Role::User)).await;
    assert!(matches!(duplicate, Err(RepoError::Conflict(_))));

    let found = repo.find_user_by_username(&name).await.unwrap().unwrap();
    assert_eq!(found.id, alice.id);
    assert_eq!(found.role, Role::User);

    let mut promoted = found.clone();
    promoted.role = Role::Admin;
    let saved = repo.update_user(&promoted, Effects::none()).await.unwrap();
    assert_eq!(saved.role, Role::Admin);
    assert_eq!(repo.get_user(alice.id).await.unwrap().unwrap().role, Role::Admin);
}

async fn red_flag_lifecycle(repo: &dyn Repository) {
    let owner = repo
        .create_user(new_user(&unique("owner"), Role::User))
        .await
        .unwrap();
    let admin = repo
        .create_user(new_user(&unique("admin"), Role::Admin))
        .await
        .unwrap();
    let pending = repo.find_status_by_name("pending").await.unwrap().unwrap();
    let resolved = repo.find_status_by_name("resolved").await.unwrap().unwrap();

    let flag = repo
        .create_red_flag(red_flag_input(), owner.id, pending.id)
        .await
        .unwrap();
    assert_eq!(repo.get_red_flag(flag.id).await.unwrap().unwrap(), flag);

    // The mutation, its audit row and its notification land together.
    let mut changed = flag.clone();
    changed.status_id = resolved.id;
    let effects = Effects::none()
        .audited(Some(AuditEntry {
            admin_id: admin.id,
            action: "red_flag.change_status:resolved".to_string(),
        }))
        .notify(NotificationCreate::in_app(owner.id, "resolved"));
    let saved = repo.save_red_flag(&changed, effects).await.unwrap();
    assert_eq!(saved.status_id, resolved.id);
    assert_eq!(saved.date, flag.date);

    let trail = repo.list_admin_actions(Page::new(0, 10_000)).await.unwrap();
    let entry = trail
        .iter()
        .rev()
        .find(|a| a.user_id == admin.id)
        .expect("audit row written");
    assert_eq!(entry.record_id, flag.id);

    let inbox = repo.list_notifications(owner.id, Page::default()).await.unwrap();
    assert_eq!(inbox.len(), 1);

    // Children go with the parent.
    repo.add_media(MediaKind::Image, RecordRef::RedFlag(flag.id), "a.jpg".to_string(), Effects::none())
        .await
        .unwrap();
    assert!(repo.delete_red_flag(flag.id, Effects::none()).await.unwrap());
    assert!(repo.get_red_flag(flag.id).await.unwrap().is_none());
    assert!(
        repo.list_media(MediaKind::Image, RecordRef::RedFlag(flag.id))
            .await
            .unwrap()
            .is_empty()
    );
    assert!(!repo.delete_red_flag(flag.id, Effects::none()).await.unwrap());
}

async fn interventions_soft_delete(repo: &dyn Repository) {
    let owner = repo
        .create_user(new_user(&unique("owner"), Role::User))
        .await
        .unwrap();
    let pending = repo.find_status_by_name("pending").await.unwrap().unwrap();

    let created = repo
        .create_intervention(intervention_input(), owner.id, pending.id)
        .await
        .unwrap();
    assert!(!created.is_deleted());

    let mut deleted = created.clone();
    deleted.soft_delete(owner.id, Utc::now());
    repo.save_intervention(&deleted, Effects::none()).await.unwrap();

    assert!(repo.get_intervention(created.id).await.unwrap().is_none());
    let listed = repo.list_interventions(Page::new(0, 10_000)).await.unwrap();
    assert!(listed.iter().all(|i| i.id != created.id));
}

async fn tags_and_media_per_parent(repo: &dyn Repository) {
    let owner = repo
        .create_user(new_user(&unique("owner"), Role::User))
        .await
        .unwrap();
    let pending = repo.find_status_by_name("pending").await.unwrap().unwrap();
    let flag = repo
        .create_red_flag(red_flag_input(), owner.id, pending.id)
        .await
        .unwrap();
    let intervention = repo
        .create_intervention(intervention_input(), owner.id, pending.id)
        .await
        .unwrap();

    let video = repo
        .add_media(
            MediaKind::Video,
            RecordRef::Intervention(intervention.id),
            "clip.mp4".to_string(),
            Effects::none(),
        )
        .await
        .unwrap();
    assert_eq!(video.intervention_id, Some(intervention.id));
    assert_eq!(video.red_flag_id, None);
    assert!(
        repo.list_media(MediaKind::Image, RecordRef::Intervention(intervention.id))
            .await
            .unwrap()
            .is_empty()
    );

    let tag = repo
        .create_tag(flag.id, intervention.id, Effects::none())
        .await
        .unwrap();
    assert_eq!(repo.list_tags(RecordRef::RedFlag(flag.id)).await.unwrap(), vec![tag.clone()]);
    assert_eq!(
        repo.list_tags(RecordRef::Intervention(intervention.id)).await.unwrap(),
        vec![tag]
    );

    let mut deleted = intervention.clone();
    deleted.soft_delete(owner.id, Utc::now());
    repo.save_intervention(&deleted, Effects::none()).await.unwrap();
    assert!(repo.list_tags(RecordRef::RedFlag(flag.id)).await.unwrap().is_empty());
}

async fn statuses_resolve_lowest_id(repo: &dyn Repository) {
    let name = unique("duplicate");
    let first = repo
        .create_status(
            StatusInput {
                name: name.clone(),
                record_type: None,
            },
            Effects::none(),
        )
        .await
        .unwrap();
    repo.create_status(
        StatusInput {
            name: name.clone(),
            record_type: Some("intervention".to_string()),
        },
        Effects::none(),
    )
    .await
    .unwrap();

    let resolved = repo.find_status_by_name(&name).await.unwrap().unwrap();
    assert_eq!(resolved.id, first.id);
}

// --- In-memory registry ---

#[tokio::test]
async fn test_memory_seeds_statuses() {
    let repo = InMemoryRepository::new();
    let statuses = repo.list_statuses(Page::default()).await.unwrap();
    let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, SEEDED_STATUSES);

    let empty = InMemoryRepository::empty();
    assert!(empty.list_statuses(Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_users_are_unique() {
    users_are_unique(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_red_flag_lifecycle() {
    red_flag_lifecycle(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_interventions_soft_delete() {
    interventions_soft_delete(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_tags_and_media() {
    tags_and_media_per_parent(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_statuses_resolve_lowest_id() {
    statuses_resolve_lowest_id(&InMemoryRepository::new()).await;
}

#[tokio::test]
async fn test_memory_lists_in_insertion_order() {
    let repo = InMemoryRepository::new();
    for name in ["a", "b", "c", "d"] {
        repo.create_user(new_user(name, Role::User)).await.unwrap();
    }

    let page = repo.list_users(Page::new(1, 2)).await.unwrap();
    let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);
}

// --- Postgres registry (needs DATABASE_URL) ---

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_users_are_unique() {
    users_are_unique(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_red_flag_lifecycle() {
    red_flag_lifecycle(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_interventions_soft_delete() {
    interventions_soft_delete(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_tags_and_media() {
    tags_and_media_per_parent(&postgres().await).await;
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_postgres_statuses_resolve_lowest_id() {
    statuses_resolve_lowest_id(&postgres().await).await;
}
