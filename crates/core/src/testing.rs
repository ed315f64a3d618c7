//! In-memory doubles for the repository and blob traits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use postline_shared::types::{AttachmentId, PageRequest, PostId, UserId};

use crate::attachment::{
    Attachment, AttachmentError, AttachmentRepository, NewAttachment, ReapClaim,
};
use crate::post::{NewPost, OwnerResolver, Post, PostError, PostRepository, TimelineQuery};
use crate::storage::{BlobStore, StorageError, StorageService};

#[derive(Debug, Clone)]
struct StoredPost {
    content: String,
    created_at: DateTime<Utc>,
    owner_id: UserId,
    attachment_id: Option<AttachmentId>,
}

#[derive(Debug, Default)]
struct State {
    next_post: i64,
    next_attachment: i64,
    posts: BTreeMap<PostId, StoredPost>,
    attachments: BTreeMap<AttachmentId, Attachment>,
    users: HashMap<String, UserId>,
    fail_attachment_inserts: bool,
    fail_next_link: bool,
    link_on_next_scan: bool,
}

impl State {
    fn hydrate(&self, id: PostId, stored: &StoredPost) -> Post {
        Post {
            id,
            content: stored.content.clone(),
            created_at: stored.created_at,
            owner_id: stored.owner_id,
            attachment: stored
                .attachment_id
                .and_then(|a| self.attachments.get(&a).cloned()),
        }
    }

    fn after(&self, anchor: PostId, owner: Option<UserId>) -> impl Iterator<Item = (&PostId, &StoredPost)> {
        self.posts
            .range(PostId::new(anchor.into_inner().saturating_add(1))..)
            .filter(move |(_, p)| owner.is_none_or(|o| o == p.owner_id))
    }

    fn push_post(&mut self, stored: StoredPost) -> PostId {
        self.next_post += 1;
        let id = PostId::new(self.next_post);
        self.posts.insert(id, stored);
        id
    }
}

/// Shared in-memory posts, attachments and users.
///
/// Clones share state, so one store can back several services.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a username and return its id.
    pub fn add_user(&self, username: &str) -> UserId {
        let id = UserId::new();
        self.state
            .lock()
            .unwrap()
            .users
            .insert(username.to_string(), id);
        id
    }

    pub fn fail_attachment_inserts(&self) {
        self.state.lock().unwrap().fail_attachment_inserts = true;
    }

    /// Make the next insert that links an attachment fail without writing.
    pub fn fail_next_link(&self) {
        self.state.lock().unwrap().fail_next_link = true;
    }

    /// Link the first candidate of the next orphan scan to a fresh post
    /// right after the scan returns.
    pub fn link_on_next_scan(&self) {
        self.state.lock().unwrap().link_on_next_scan = true;
    }

    pub fn attachment(&self, id: AttachmentId) -> Option<Attachment> {
        self.state.lock().unwrap().attachments.get(&id).cloned()
    }

    pub fn post_count(&self) -> usize {
        self.state.lock().unwrap().posts.len()
    }

    pub fn attachment_count(&self) -> usize {
        self.state.lock().unwrap().attachments.len()
    }
}

impl PostRepository for InMemoryStore {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>, PostError> {
        let state = self.state.lock().unwrap();
        Ok(state.posts.get(&id).map(|p| state.hydrate(id, p)))
    }

    async fn find_page(
        &self,
        query: TimelineQuery,
        page: PageRequest,
    ) -> Result<(Vec<Post>, u64), PostError> {
        let state = self.state.lock().unwrap();
        let matching: Vec<(&PostId, &StoredPost)> = state
            .posts
            .iter()
            .rev()
            .filter(|(id, p)| query.matches(**id, p.owner_id))
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap())
            .take(usize::try_from(page.limit()).unwrap())
            .map(|(id, p)| state.hydrate(*id, p))
            .collect();

        Ok((items, total))
    }

    async fn find_after(
        &self,
        anchor: PostId,
        owner: Option<UserId>,
        limit: Option<u64>,
    ) -> Result<Vec<Post>, PostError> {
        let state = self.state.lock().unwrap();
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap());
        Ok(state
            .after(anchor, owner)
            .take(limit)
            .map(|(id, p)| state.hydrate(*id, p))
            .collect())
    }

    async fn count_after(&self, anchor: PostId, owner: Option<UserId>) -> Result<u64, PostError> {
        let state = self.state.lock().unwrap();
        Ok(state.after(anchor, owner).count() as u64)
    }

    async fn insert(
        &self,
        post: NewPost,
        attachment: Option<AttachmentId>,
    ) -> Result<Post, PostError> {
        let mut state = self.state.lock().unwrap();

        if let Some(attachment_id) = attachment {
            if std::mem::take(&mut state.fail_next_link) {
                return Err(PostError::repository("injected link failure"));
            }
            let found = state
                .attachments
                .get(&attachment_id)
                .ok_or(PostError::AttachmentNotFound(attachment_id))?;
            if let Some(post_id) = found.post_id {
                return Err(PostError::AttachmentAlreadyLinked {
                    attachment_id,
                    post_id,
                });
            }
        }

        let stored = StoredPost {
            content: post.content,
            created_at: Utc::now(),
            owner_id: post.owner_id,
            attachment_id: attachment,
        };
        let id = state.push_post(stored.clone());
        if let Some(a) = attachment.and_then(|a| state.attachments.get_mut(&a)) {
            a.post_id = Some(id);
        }

        Ok(state.hydrate(id, &stored))
    }

    async fn delete(&self, id: PostId, attachment: Option<AttachmentId>) -> Result<(), PostError> {
        let mut state = self.state.lock().unwrap();
        if !state.posts.contains_key(&id) {
            return Err(PostError::NotFound(id));
        }
        if let Some(a) = attachment {
            state.attachments.remove(&a);
        }
        state.posts.remove(&id);
        Ok(())
    }
}

impl OwnerResolver for InMemoryStore {
    async fn resolve(&self, username: &str) -> Result<UserId, PostError> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(username)
            .copied()
            .ok_or_else(|| PostError::OwnerNotFound(username.to_string()))
    }
}

/// Claim over an in-memory attachment row.
pub struct MemoryClaim {
    state: Arc<Mutex<State>>,
    attachment: Attachment,
}

impl ReapClaim for MemoryClaim {
    fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    async fn delete(self) -> Result<(), AttachmentError> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .remove(&self.attachment.id);
        Ok(())
    }

    async fn release(self) -> Result<(), AttachmentError> {
        Ok(())
    }
}

impl AttachmentRepository for InMemoryStore {
    type Claim = MemoryClaim;

    async fn create(&self, input: NewAttachment) -> Result<Attachment, AttachmentError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_attachment_inserts {
            return Err(AttachmentError::repository("injected insert failure"));
        }
        state.next_attachment += 1;
        let attachment = Attachment {
            id: AttachmentId::new(state.next_attachment),
            created_at: input.created_at,
            blob_name: input.blob_name,
            content_type: input.content_type,
            post_id: None,
        };
        state.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn find_by_id(&self, id: AttachmentId) -> Result<Option<Attachment>, AttachmentError> {
        Ok(self.attachment(id))
    }

    async fn find_by_blob_name(
        &self,
        blob_name: &str,
    ) -> Result<Option<Attachment>, AttachmentError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attachments
            .values()
            .find(|a| a.blob_name == blob_name)
            .cloned())
    }

    async fn find_unlinked_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Attachment>, AttachmentError> {
        let mut state = self.state.lock().unwrap();
        let mut candidates: Vec<Attachment> = state
            .attachments
            .values()
            .filter(|a| a.is_orphaned_before(cutoff))
            .cloned()
            .collect();
        candidates.sort_by_key(|a| (a.created_at, a.id));

        if std::mem::take(&mut state.link_on_next_scan) {
            if let Some(first) = candidates.first() {
                let owner = state.users.values().next().copied().unwrap_or_default();
                let post_id = state.push_post(StoredPost {
                    content: "linked during a sweep".to_string(),
                    created_at: Utc::now(),
                    owner_id: owner,
                    attachment_id: Some(first.id),
                });
                if let Some(a) = state.attachments.get_mut(&first.id) {
                    a.post_id = Some(post_id);
                }
            }
        }

        Ok(candidates)
    }

    async fn claim_unlinked(&self, id: AttachmentId) -> Result<Option<MemoryClaim>, AttachmentError> {
        let current = self.attachment(id).filter(|a| !a.is_linked());
        Ok(current.map(|attachment| MemoryClaim {
            state: Arc::clone(&self.state),
            attachment,
        }))
    }
}

/// Blob store backed by a map, with per-name delete failures.
#[derive(Debug, Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashMap<String, Bytes>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Make deleting `name` fail with an I/O error.
    pub fn fail_deletes_of(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

impl BlobStore for MemoryBlobs {
    async fn put(&self, bytes: Bytes, _content_type: &str) -> Result<String, StorageError> {
        let name = StorageService::generate_blob_name();
        self.blobs.lock().unwrap().insert(name.clone(), bytes);
        Ok(name)
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, StorageError> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(StorageError::io(format!("injected failure deleting {name}")));
        }
        Ok(self.blobs.lock().unwrap().remove(name).is_some())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }
}
