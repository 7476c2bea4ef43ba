//! Integration tests for accountd-db
//!
//! Exercises the users table against a real in-memory SQLite database.

use accountd_db::{connect, entities::user, migrate};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set, SqlErr,
};

/// Helper to create a migrated test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn test_user(email: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: NotSet,
        email: Set(email.to_string()),
        password_hash: Set("$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$placeholder".to_string()),
        name: Set(None),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let db = setup_test_db().await;

    // A second run must be a no-op, not a failure
    assert!(migrate(&db).await.is_ok());
}

#[tokio::test]
async fn test_insert_assigns_numeric_id() {
    let db = setup_test_db().await;

    let created = test_user("a@x.com").insert(&db).await.expect("insert failed");

    assert!(created.id > 0);
    assert_eq!(created.email, "a@x.com");
}

#[tokio::test]
async fn test_find_by_email() {
    let db = setup_test_db().await;

    let created = test_user("find@x.com").insert(&db).await.unwrap();

    let found = user::Entity::find()
        .filter(user::Column::Email.eq("find@x.com"))
        .one(&db)
        .await
        .unwrap();

    assert_eq!(found.map(|u| u.id), Some(created.id));

    let missing = user::Entity::find()
        .filter(user::Column::Email.eq("nobody@x.com"))
        .one(&db)
        .await
        .unwrap();

    assert!(missing.is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_a_typed_unique_violation() {
    let db = setup_test_db().await;

    test_user("dup@x.com").insert(&db).await.unwrap();

    let err = test_user("dup@x.com")
        .insert(&db)
        .await
        .expect_err("second insert must fail");

    assert!(matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ));
}

#[tokio::test]
async fn test_update_user_fields() {
    let db = setup_test_db().await;

    let created = test_user("update@x.com").insert(&db).await.unwrap();

    let mut active: user::ActiveModel = created.clone().into();
    active.name = Set(Some("Renamed".to_string()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&db).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name.as_deref(), Some("Renamed"));
}
