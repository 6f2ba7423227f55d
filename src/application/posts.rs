//! Write-side service for posts and comments.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, GroupsRepo, NewComment, NewPost, PostUpdate, PostsRepo, RepoError,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::{validate_comment_text, validate_image_upload, validate_post_text};

#[derive(Debug, Error)]
#[error("media storage failed: {0}")]
pub struct MediaStoreError(pub String);

/// Stores uploaded images and returns their media-relative path.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store_image(
        &self,
        bytes: &[u8],
        original_name: &str,
        extension: &str,
    ) -> Result<String, MediaStoreError>;
}

/// An uploaded image as it arrived in the multipart payload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum PostActionError {
    #[error("{0}")]
    Validation(String),
    #[error("selected group does not exist")]
    UnknownGroup,
    #[error("post not found")]
    NotFound,
    #[error("only the author may change a post")]
    NotAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Media(#[from] MediaStoreError),
}

impl From<DomainError> for PostActionError {
    fn from(error: DomainError) -> Self {
        Self::Validation(error.to_string())
    }
}

/// Raw form payload for creating or editing a post.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<ImageUpload>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    media: Arc<dyn MediaStore>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
            media,
        }
    }

    async fn resolve_group(&self, group_id: Option<Uuid>) -> Result<Option<Uuid>, PostActionError> {
        match group_id {
            None => Ok(None),
            Some(id) => {
                let group = self
                    .groups
                    .find_group_by_id(id)
                    .await?
                    .ok_or(PostActionError::UnknownGroup)?;
                Ok(Some(group.id))
            }
        }
    }

    async fn store_upload(
        &self,
        image: Option<&ImageUpload>,
    ) -> Result<Option<String>, PostActionError> {
        match image {
            None => Ok(None),
            Some(upload) => {
                let extension = validate_image_upload(&upload.bytes)?;
                let path = self
                    .media
                    .store_image(&upload.bytes, &upload.filename, extension)
                    .await?;
                Ok(Some(path))
            }
        }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostActionError> {
        let text = validate_post_text(&input.text)?;
        let group_id = self.resolve_group(input.group_id).await?;
        let image = self.store_upload(input.image.as_ref()).await?;
        let post = self
            .posts
            .create_post(NewPost {
                text,
                image,
                author_id,
                group_id,
            })
            .await?;
        Ok(post)
    }

    /// Fetches a post for its author, enforcing ownership up front so
    /// edit forms never leak other people's drafts into the editor.
    pub async fn get_owned(
        &self,
        editor_id: Uuid,
        post_id: Uuid,
    ) -> Result<PostRecord, PostActionError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostActionError::NotFound)?;
        if existing.author_id != editor_id {
            return Err(PostActionError::NotAuthor);
        }
        Ok(existing)
    }

    /// Applies an edit. The stored image is kept when the form carries
    /// no new upload; `created` is never touched.
    pub async fn edit(
        &self,
        editor_id: Uuid,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostActionError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostActionError::NotFound)?;
        if existing.author_id != editor_id {
            return Err(PostActionError::NotAuthor);
        }
        let text = validate_post_text(&input.text)?;
        let group_id = self.resolve_group(input.group_id).await?;
        let image = self.store_upload(input.image.as_ref()).await?;
        let updated = self
            .posts
            .update_post(PostUpdate {
                id: existing.id,
                text,
                group_id,
                image,
            })
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, actor_id: Uuid, post_id: Uuid) -> Result<(), PostActionError> {
        let existing = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostActionError::NotFound)?;
        if existing.author_id != actor_id {
            return Err(PostActionError::NotAuthor);
        }
        self.posts.delete_post(existing.id).await?;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, PostActionError> {
        let text = validate_comment_text(text)?;
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostActionError::NotFound);
        }
        let comment = self
            .comments
            .create_comment(NewComment {
                text,
                post_id,
                author_id,
            })
            .await?;
        Ok(comment)
    }
}
