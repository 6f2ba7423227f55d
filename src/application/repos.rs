//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Filter over the joined post listing. Exactly one of the optional
/// fields is set per feed; `followed_by` selects posts whose author is
/// followed by the given user.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostQueryFilter {
    pub author_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub followed_by: Option<Uuid>,
}

impl PostQueryFilter {
    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn by_group(group_id: Uuid) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    pub fn followed_by(user_id: Uuid) -> Self {
        Self {
            followed_by: Some(user_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_salt: String,
    pub password_hash: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
}

/// Edit payload. `image` of `None` keeps the stored image untouched.
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, RepoError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest-first listing of joined post rows.
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<usize, RepoError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
    async fn create_post(&self, new_post: NewPost) -> Result<PostRecord, RepoError>;
    async fn update_post(&self, update: PostUpdate) -> Result<PostRecord, RepoError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for a post, newest first.
    async fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
    async fn create_comment(&self, new_comment: NewComment) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    async fn create_follow(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<FollowRecord, RepoError>;
    /// Returns whether a subscription existed and was removed.
    async fn delete_follow(&self, follower_id: Uuid, followed_id: Uuid)
        -> Result<bool, RepoError>;
    async fn follow_exists(&self, follower_id: Uuid, followed_id: Uuid)
        -> Result<bool, RepoError>;
    async fn count_followers(&self, user_id: Uuid) -> Result<usize, RepoError>;
    async fn count_following(&self, user_id: Uuid) -> Result<usize, RepoError>;
}
