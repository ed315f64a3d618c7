//! Post repository for database operations.
//!
//! Timeline reads are keyset range queries on `posts.id`. Post creation and
//! deletion touch both `posts` and `attachments` inside one transaction.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::debug;

use super::attachment;
use crate::entities::{attachments, posts};
use postline_core::post::{
    NewPost, Post, PostError, PostRepository as PostRepoTrait, TimelineQuery,
};
use postline_shared::types::{AttachmentId, PageRequest, PostId, UserId};

/// Post repository implementation.
#[derive(Debug, Clone)]
pub struct PostRepository {
    db: DatabaseConnection,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn repo_err(e: DbErr) -> PostError {
    PostError::repository(e.to_string())
}

fn owner_condition(owner: Option<UserId>) -> Condition {
    let mut cond = Condition::all();
    if let Some(owner) = owner {
        cond = cond.add(posts::Column::UserId.eq(owner.into_inner()));
    }
    cond
}

fn page_condition(query: TimelineQuery) -> Condition {
    let mut cond = owner_condition(query.owner);
    if let Some(before) = query.before {
        cond = cond.add(posts::Column::Id.lt(before.into_inner()));
    }
    cond
}

fn after_condition(anchor: PostId, owner: Option<UserId>) -> Condition {
    owner_condition(owner).add(posts::Column::Id.gt(anchor.into_inner()))
}

impl PostRepoTrait for PostRepository {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        let row = posts::Entity::find_by_id(id.into_inner())
            .find_also_related(attachments::Entity)
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(row.map(to_domain))
    }

    async fn find_page(
        &self,
        query: TimelineQuery,
        page: PageRequest,
    ) -> Result<(Vec<Post>, u64), PostError> {
        let total = posts::Entity::find()
            .filter(page_condition(query))
            .count(&self.db)
            .await
            .map_err(repo_err)?;

        let rows = posts::Entity::find()
            .filter(page_condition(query))
            .order_by_desc(posts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .find_also_related(attachments::Entity)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok((rows.into_iter().map(to_domain).collect(), total))
    }

    async fn find_after(
        &self,
        anchor: PostId,
        owner: Option<UserId>,
        limit: Option<u64>,
    ) -> Result<Vec<Post>, PostError> {
        let rows = posts::Entity::find()
            .filter(after_condition(anchor, owner))
            .order_by_asc(posts::Column::Id)
            .limit(limit)
            .find_also_related(attachments::Entity)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(rows.into_iter().map(to_domain).collect())
    }

    async fn count_after(&self, anchor: PostId, owner: Option<UserId>) -> Result<u64, PostError> {
        posts::Entity::find()
            .filter(after_condition(anchor, owner))
            .count(&self.db)
            .await
            .map_err(repo_err)
    }

    async fn insert(
        &self,
        post: NewPost,
        attachment: Option<AttachmentId>,
    ) -> Result<Post, PostError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        let model = posts::ActiveModel {
            id: NotSet,
            content: Set(post.content),
            created_at: Set(Utc::now().into()),
            user_id: Set(post.owner_id.into_inner()),
            attachment_id: Set(attachment.map(AttachmentId::into_inner)),
        }
        .insert(&txn)
        .await
        .map_err(repo_err)?;

        let linked = match attachment {
            Some(attachment_id) => Some(link(&txn, model.id, attachment_id).await?),
            None => None,
        };

        txn.commit().await.map_err(repo_err)?;

        debug!(post_id = model.id, "Post row inserted");
        Ok(to_domain((model, linked)))
    }

    async fn delete(&self, id: PostId, attachment: Option<AttachmentId>) -> Result<(), PostError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        if let Some(attachment_id) = attachment {
            attachments::Entity::delete_many()
                .filter(attachments::Column::Id.eq(attachment_id.into_inner()))
                .filter(attachments::Column::PostId.eq(id.into_inner()))
                .exec(&txn)
                .await
                .map_err(repo_err)?;
        }

        let result = posts::Entity::delete_by_id(id.into_inner())
            .exec(&txn)
            .await
            .map_err(repo_err)?;

        if result.rows_affected == 0 {
            txn.rollback().await.map_err(repo_err)?;
            return Err(PostError::NotFound(id));
        }

        txn.commit().await.map_err(repo_err)?;
        Ok(())
    }
}

/// Point an unlinked attachment at `post_id`.
///
/// The conditional update is the link's only guard: it waits for any row lock
/// held by a sweep, and matches nothing if the row was reaped or linked.
async fn link<C: ConnectionTrait>(
    conn: &C,
    post_id: i64,
    attachment_id: AttachmentId,
) -> Result<attachments::Model, PostError> {
    let result = attachments::Entity::update_many()
        .col_expr(attachments::Column::PostId, Expr::value(post_id))
        .filter(attachments::Column::Id.eq(attachment_id.into_inner()))
        .filter(attachments::Column::PostId.is_null())
        .exec(conn)
        .await
        .map_err(repo_err)?;

    let current = attachments::Entity::find_by_id(attachment_id.into_inner())
        .one(conn)
        .await
        .map_err(repo_err)?;

    match (result.rows_affected, current) {
        (1, Some(model)) => Ok(model),
        (_, None) => Err(PostError::AttachmentNotFound(attachment_id)),
        (_, Some(model)) => Err(PostError::AttachmentAlreadyLinked {
            attachment_id,
            post_id: model.post_id.map_or(PostId::new(post_id), PostId::new),
        }),
    }
}

/// Convert a post row and its joined attachment to the domain model.
fn to_domain((model, attachment_model): (posts::Model, Option<attachments::Model>)) -> Post {
    Post {
        id: PostId::new(model.id),
        content: model.content,
        created_at: model.created_at.with_timezone(&Utc),
        owner_id: UserId::from_uuid(model.user_id),
        attachment: attachment_model.map(attachment::to_domain),
    }
}
