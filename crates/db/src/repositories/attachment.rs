//! Attachment repository for database operations.
//!
//! Implements attachment persistence and the reaper's row claims using SeaORM.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    NotSet, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use crate::entities::attachments;
use postline_core::attachment::{
    Attachment, AttachmentError, AttachmentRepository as AttachmentRepoTrait, NewAttachment,
    ReapClaim,
};
use postline_shared::types::{AttachmentId, PostId};

/// Attachment repository implementation.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    db: DatabaseConnection,
}

impl AttachmentRepository {
    /// Create a new attachment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn repo_err(e: sea_orm::DbErr) -> AttachmentError {
    AttachmentError::repository(e.to_string())
}

impl AttachmentRepoTrait for AttachmentRepository {
    type Claim = DbReapClaim;

    async fn create(&self, input: NewAttachment) -> Result<Attachment, AttachmentError> {
        let active_model = attachments::ActiveModel {
            id: NotSet,
            created_at: Set(input.created_at.into()),
            blob_name: Set(input.blob_name),
            content_type: Set(input.content_type),
            post_id: Set(None),
        };

        let model = active_model.insert(&self.db).await.map_err(repo_err)?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: AttachmentId) -> Result<Option<Attachment>, AttachmentError> {
        let model = attachments::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_domain))
    }

    async fn find_by_blob_name(
        &self,
        blob_name: &str,
    ) -> Result<Option<Attachment>, AttachmentError> {
        let model = attachments::Entity::find()
            .filter(attachments::Column::BlobName.eq(blob_name))
            .one(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(model.map(to_domain))
    }

    async fn find_unlinked_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Attachment>, AttachmentError> {
        let models = attachments::Entity::find()
            .filter(attachments::Column::PostId.is_null())
            .filter(attachments::Column::CreatedAt.lt(cutoff))
            .order_by_asc(attachments::Column::CreatedAt)
            .order_by_asc(attachments::Column::Id)
            .all(&self.db)
            .await
            .map_err(repo_err)?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn claim_unlinked(&self, id: AttachmentId) -> Result<Option<DbReapClaim>, AttachmentError> {
        let txn = self.db.begin().await.map_err(repo_err)?;

        // Blocks behind an in-flight link of the same row and re-evaluates
        // `post_id IS NULL` once that transaction commits.
        let model = attachments::Entity::find_by_id(id.into_inner())
            .filter(attachments::Column::PostId.is_null())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(repo_err)?;

        match model {
            Some(model) => Ok(Some(DbReapClaim {
                txn,
                attachment: to_domain(model),
            })),
            None => {
                txn.rollback().await.map_err(repo_err)?;
                Ok(None)
            }
        }
    }
}

/// Row lock on an unlinked attachment, held by an open transaction.
///
/// Dropping the claim rolls the transaction back.
pub struct DbReapClaim {
    txn: DatabaseTransaction,
    attachment: Attachment,
}

impl ReapClaim for DbReapClaim {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    async fn delete(self) -> Result<(), AttachmentError> {
        attachments::Entity::delete_by_id(self.attachment.id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(repo_err)?;
        self.txn.commit().await.map_err(repo_err)?;

        debug!(attachment_id = %self.attachment.id, "Attachment row deleted");
        Ok(())
    }

    async fn release(self) -> Result<(), AttachmentError> {
        self.txn.rollback().await.map_err(repo_err)
    }
}

/// Convert database model to domain model.
pub(crate) fn to_domain(model: attachments::Model) -> Attachment {
    Attachment {
        id: AttachmentId::new(model.id),
        created_at: model.created_at.with_timezone(&Utc),
        blob_name: model.blob_name,
        content_type: model.content_type,
        post_id: model.post_id.map(PostId::new),
    }
}
