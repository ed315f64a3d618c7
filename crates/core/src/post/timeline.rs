//! Keyset pagination over the post timeline.

use std::sync::Arc;

use tracing::debug;

use postline_shared::types::{PageRequest, PageResponse, PostId, UserId};

use super::error::PostError;
use super::repository::{OwnerResolver, PostRepository};
use super::types::{Post, TimelineQuery};

/// Timeline reads anchored on post ids.
///
/// Every read takes an optional username; it is resolved to an owner id before
/// the store is queried, and an unknown username fails with `OwnerNotFound`.
pub struct TimelineService<P: PostRepository, O: OwnerResolver> {
    posts: Arc<P>,
    owners: Arc<O>,
}

impl<P: PostRepository, O: OwnerResolver> TimelineService<P, O> {
    /// Create a new timeline service.
    #[must_use]
    pub fn new(posts: Arc<P>, owners: Arc<O>) -> Self {
        Self { posts, owners }
    }

    async fn owner(&self, username: Option<&str>) -> Result<Option<UserId>, PostError> {
        match username {
            Some(name) => self.owners.resolve(name).await.map(Some),
            None => Ok(None),
        }
    }

    async fn page(
        &self,
        query: TimelineQuery,
        page: PageRequest,
    ) -> Result<PageResponse<Post>, PostError> {
        let page = page.normalized();
        let (items, total) = self.posts.find_page(query, page).await?;
        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    /// Newest posts first.
    ///
    /// # Errors
    ///
    /// Returns `OwnerNotFound` for an unknown username, or a repository error.
    pub async fn get_latest(
        &self,
        username: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<Post>, PostError> {
        let owner = self.owner(username).await?;
        self.page(TimelineQuery { owner, before: None }, page).await
    }

    /// Posts older than `anchor`, newest first.
    ///
    /// The anchor does not have to exist.
    ///
    /// # Errors
    ///
    /// Returns `OwnerNotFound` for an unknown username, or a repository error.
    pub async fn get_before(
        &self,
        anchor: PostId,
        username: Option<&str>,
        page: PageRequest,
    ) -> Result<PageResponse<Post>, PostError> {
        let owner = self.owner(username).await?;
        self.page(
            TimelineQuery {
                owner,
                before: Some(anchor),
            },
            page,
        )
        .await
    }

    /// Posts newer than `anchor`, oldest first, unpaged.
    ///
    /// `limit` caps the list; `None` returns every match.
    ///
    /// # Errors
    ///
    /// Returns `OwnerNotFound` for an unknown username, or a repository error.
    pub async fn get_after(
        &self,
        anchor: PostId,
        username: Option<&str>,
        limit: Option<u64>,
    ) -> Result<Vec<Post>, PostError> {
        let owner = self.owner(username).await?;
        let posts = self.posts.find_after(anchor, owner, limit).await?;
        debug!(anchor = %anchor, found = posts.len(), "Fetched newer posts");
        Ok(posts)
    }

    /// Number of posts newer than `anchor`.
    ///
    /// # Errors
    ///
    /// Returns `OwnerNotFound` for an unknown username, or a repository error.
    pub async fn get_new_count(
        &self,
        anchor: PostId,
        username: Option<&str>,
    ) -> Result<u64, PostError> {
        let owner = self.owner(username).await?;
        self.posts.count_after(anchor, owner).await
    }

    /// A single post.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the post does not exist.
    pub async fn get_post(&self, id: PostId) -> Result<Post, PostError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(PostError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::NewPost;
    use crate::testing::InMemoryStore;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn service(store: &InMemoryStore) -> TimelineService<InMemoryStore, InMemoryStore> {
        TimelineService::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    async fn seed(store: &InMemoryStore, owner: UserId, n: usize) -> Vec<PostId> {
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let post = NewPost::new(format!("post number {i}"), owner).unwrap();
            ids.push(store.insert(post, None).await.unwrap().id);
        }
        ids
    }

    fn ids(posts: &[Post]) -> Vec<PostId> {
        posts.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_latest_is_strictly_descending() {
        let store = InMemoryStore::new();
        let owner = store.add_user("u1");
        seed(&store, owner, 7).await;

        let page = service(&store)
            .get_latest(None, PageRequest::new(1, 100))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 7);
        assert_eq!(page.meta.total, 7);
        assert!(page.data.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_latest_pages() {
        let store = InMemoryStore::new();
        let owner = store.add_user("u1");
        let created = seed(&store, owner, 5).await;
        let service = service(&store);

        let second = service
            .get_latest(None, PageRequest::new(2, 2))
            .await
            .unwrap();

        assert_eq!(ids(&second.data), vec![created[2], created[1]]);
        assert_eq!(second.meta.total, 5);
        assert_eq!(second.meta.total_pages, 3);
    }

    #[tokio::test]
    async fn test_owner_scoped_before_and_after() {
        let store = InMemoryStore::new();
        let u1 = store.add_user("u1");
        let u2 = store.add_user("u2");

        let mut u1_posts = Vec::new();
        for i in 0..5 {
            seed(&store, u2, 1).await;
            let post = NewPost::new(format!("u1 says hello {i}"), u1).unwrap();
            u1_posts.push(store.insert(post, None).await.unwrap().id);
        }
        let service = service(&store);
        let post3 = u1_posts[2];

        let before = service
            .get_before(post3, Some("u1"), PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(ids(&before.data), vec![u1_posts[1], u1_posts[0]]);

        let after = service.get_after(post3, Some("u1"), None).await.unwrap();
        assert_eq!(ids(&after), vec![u1_posts[3], u1_posts[4]]);

        let count = service.get_new_count(post3, Some("u1")).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_unknown_owner() {
        let store = InMemoryStore::new();
        let service = service(&store);

        let result = service.get_latest(Some("ghost"), PageRequest::default()).await;
        assert!(matches!(result, Err(PostError::OwnerNotFound(name)) if name == "ghost"));

        let result = service.get_new_count(PostId::new(1), Some("ghost")).await;
        assert!(matches!(result, Err(PostError::OwnerNotFound(_))));
    }

    #[tokio::test]
    async fn test_anchor_need_not_exist() {
        let store = InMemoryStore::new();
        let owner = store.add_user("u1");
        let created = seed(&store, owner, 3).await;
        let service = service(&store);

        let beyond = PostId::new(created[2].into_inner() + 100);
        let before = service
            .get_before(beyond, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(before.data.len(), 3);

        let after = service.get_after(PostId::new(0), None, None).await.unwrap();
        assert_eq!(ids(&after), created);
    }

    #[tokio::test]
    async fn test_get_after_limit() {
        let store = InMemoryStore::new();
        let owner = store.add_user("u1");
        let created = seed(&store, owner, 4).await;

        let after = service(&store)
            .get_after(created[0], None, Some(2))
            .await
            .unwrap();
        assert_eq!(ids(&after), vec![created[1], created[2]]);
    }

    #[tokio::test]
    async fn test_get_post() {
        let store = InMemoryStore::new();
        let owner = store.add_user("u1");
        let created = seed(&store, owner, 1).await;
        let service = service(&store);

        assert_eq!(service.get_post(created[0]).await.unwrap().owner_id, owner);
        assert!(matches!(
            service.get_post(PostId::new(999)).await,
            Err(PostError::NotFound(_))
        ));
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_partition_and_count(
            owners in proptest::collection::vec(0usize..3, 0..30),
            anchor in 0i64..35,
            filter in proptest::option::of(0usize..3),
        ) {
            runtime().block_on(async {
                let store = InMemoryStore::new();
                let names = ["a", "b", "c"];
                let users: Vec<UserId> = names.iter().map(|n| store.add_user(n)).collect();
                for (i, owner) in owners.iter().enumerate() {
                    let post = NewPost::new(format!("generated post {i}"), users[*owner]).unwrap();
                    store.insert(post, None).await.unwrap();
                }

                let service = service(&store);
                let username = filter.map(|i| names[i]);
                let anchor = PostId::new(anchor);

                let before = service
                    .get_before(anchor, username, PageRequest::new(1, 100))
                    .await
                    .unwrap();
                let after = service.get_after(anchor, username, None).await.unwrap();
                let count = service.get_new_count(anchor, username).await.unwrap();
                let all = service
                    .get_latest(username, PageRequest::new(1, 100))
                    .await
                    .unwrap();

                prop_assert_eq!(count, after.len() as u64);
                prop_assert!(after.windows(2).all(|w| w[0].id < w[1].id));

                let anchor_post: Vec<PostId> = all
                    .data
                    .iter()
                    .filter(|p| p.id == anchor)
                    .map(|p| p.id)
                    .collect();

                let mut union: Vec<PostId> = ids(&before.data);
                union.extend(anchor_post);
                union.extend(ids(&after));
                let distinct: BTreeSet<PostId> = union.iter().copied().collect();
                let expected: BTreeSet<PostId> = ids(&all.data).into_iter().collect();

                prop_assert_eq!(distinct.len(), union.len());
                prop_assert_eq!(distinct, expected);
                Ok(())
            })?;
        }
    }
}
