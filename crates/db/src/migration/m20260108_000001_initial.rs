//! Initial database migration.
//!
//! Creates users, posts and attachments. Posts and attachments reference each
//! other; the post side of that cycle is deferred to commit so a post and its
//! attachment can be removed in either order inside one transaction.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: USERS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 2: POSTS & ATTACHMENTS
        // ============================================================
        db.execute_unprepared(ATTACHMENTS_SQL).await?;
        db.execute_unprepared(POSTS_SQL).await?;
        db.execute_unprepared(CROSS_REFERENCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(255) NOT NULL UNIQUE,
    display_name VARCHAR(255) NOT NULL,
    password_hash VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ATTACHMENTS_SQL: &str = r"
CREATE TABLE attachments (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    blob_name VARCHAR(64) NOT NULL UNIQUE,
    content_type VARCHAR(255) NOT NULL,
    post_id BIGINT
);

-- Orphan sweep: unlinked attachments by age
CREATE INDEX idx_attachments_unlinked ON attachments(created_at, id) WHERE post_id IS NULL;
";

const POSTS_SQL: &str = r"
CREATE TABLE posts (
    id BIGSERIAL PRIMARY KEY,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    attachment_id BIGINT,
    CONSTRAINT chk_content_length CHECK (char_length(content) BETWEEN 10 AND 5000)
);

-- Owner timelines
CREATE INDEX idx_posts_user ON posts(user_id, id DESC);
";

const CROSS_REFERENCES_SQL: &str = r"
ALTER TABLE attachments
    ADD CONSTRAINT fk_attachments_post
    FOREIGN KEY (post_id) REFERENCES posts(id);

CREATE UNIQUE INDEX idx_attachments_post ON attachments(post_id) WHERE post_id IS NOT NULL;

ALTER TABLE posts
    ADD CONSTRAINT fk_posts_attachment
    FOREIGN KEY (attachment_id) REFERENCES attachments(id)
    DEFERRABLE INITIALLY DEFERRED;
";

const DROP_ALL_SQL: &str = r"
ALTER TABLE IF EXISTS posts DROP CONSTRAINT IF EXISTS fk_posts_attachment;
ALTER TABLE IF EXISTS attachments DROP CONSTRAINT IF EXISTS fk_attachments_post;
DROP TABLE IF EXISTS posts CASCADE;
DROP TABLE IF EXISTS attachments CASCADE;
DROP TABLE IF EXISTS users CASCADE;
";
