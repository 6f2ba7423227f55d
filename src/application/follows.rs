//! Subscription management between users.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error("users cannot follow themselves")]
    SelfFollow,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Subscribes `follower_id` to the named author. Repeated follows
    /// are idempotent.
    pub async fn follow(&self, follower_id: Uuid, username: &str) -> Result<(), FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;
        if author.id == follower_id {
            return Err(FollowError::SelfFollow);
        }
        match self.follows.create_follow(follower_id, author.id).await {
            Ok(_) => Ok(()),
            Err(RepoError::Duplicate { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a subscription. Unfollowing someone never followed is a
    /// no-op.
    pub async fn unfollow(&self, follower_id: Uuid, username: &str) -> Result<(), FollowError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)?;
        self.follows.delete_follow(follower_id, author.id).await?;
        Ok(())
    }
}
