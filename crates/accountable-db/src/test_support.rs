//! Shared fixtures for accountable-db unit tests.

use std::sync::Arc;

use accountable_config::AccountableConfig;
use accountable_core::{StampRole, StampSet};

use crate::schema::ModelSchema;
use crate::service::RecordService;

pub const TABLES: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE posts (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    created_by INTEGER,
    updated_by INTEGER,
    deleted_by INTEGER,
    created_at TEXT,
    updated_at TEXT,
    deleted_at TEXT
);
CREATE TABLE comments (
    id INTEGER PRIMARY KEY,
    body TEXT NOT NULL,
    created_by INTEGER,
    updated_by INTEGER,
    deleted_at TEXT
);
CREATE TABLE tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_by INTEGER
);
INSERT INTO users (id, name) VALUES (7, 'ada'), (9, 'grace');
";

/// Soft-deleting, timestamped, all three stamps.
pub fn posts_schema() -> ModelSchema {
    ModelSchema::new("posts")
        .columns(["title", "created_by", "updated_by", "deleted_by"])
        .timestamps()
        .soft_deletes()
        .stamps(StampSet::ALL)
}

/// Soft-deleting without a `deleted_by` column.
pub fn comments_schema() -> ModelSchema {
    ModelSchema::new("comments")
        .columns(["body", "created_by", "updated_by"])
        .soft_deletes()
        .stamps(StampSet::CREATE_UPDATE)
}

/// Hard-deleting, creator stamp only.
pub fn tags_schema() -> ModelSchema {
    ModelSchema::new("tags")
        .columns(["name", "created_by"])
        .stamps(StampSet::only(StampRole::CreatedBy))
}

pub struct Fixture {
    pub svc: RecordService,
    pub posts: Arc<ModelSchema>,
    pub comments: Arc<ModelSchema>,
    pub tags: Arc<ModelSchema>,
}

/// In-memory service with `users`, `posts`, `comments` and `tags` registered.
pub async fn fixture() -> Fixture {
    let mut svc = RecordService::new_local(":memory:", AccountableConfig::default())
        .await
        .unwrap();
    svc.db().execute_batch(TABLES).await.unwrap();

    let posts = svc.register_accountable(posts_schema()).unwrap();
    let comments = svc.register_accountable(comments_schema()).unwrap();
    let tags = svc.register_accountable(tags_schema()).unwrap();

    Fixture {
        svc,
        posts,
        comments,
        tags,
    }
}
