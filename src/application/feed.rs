//! Read-side services building view contexts for the public pages.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::PostRecord;
use crate::presentation::views::{
    CommentView, FollowFeedContext, GroupPageContext, GroupView, IndexContext, Paginator,
    PostCard, PostDetailContext, ProfileContext,
};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error("unknown post")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    page_size: usize,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: usize,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            page_size: page_size.max(1),
        }
    }

    async fn paged_posts(
        &self,
        filter: PostQueryFilter,
        requested: Option<usize>,
    ) -> Result<Paginated<PostRecord>, FeedError> {
        let total = self.posts.count_posts(&filter).await?;
        let request = PageRequest::clamped(requested, total, self.page_size);
        let rows = self.posts.list_posts(&filter, request).await?;
        Ok(Paginated::new(rows, request, total))
    }

    pub async fn index_page(&self, requested: Option<usize>) -> Result<IndexContext, FeedError> {
        let page = self
            .paged_posts(PostQueryFilter::default(), requested)
            .await?;
        Ok(IndexContext {
            paginator: Paginator::from_page(&page),
            cards: page.items.iter().map(PostCard::from_record).collect(),
        })
    }

    pub async fn group_page(
        &self,
        slug: &str,
        requested: Option<usize>,
    ) -> Result<GroupPageContext, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self
            .paged_posts(PostQueryFilter::by_group(group.id), requested)
            .await?;
        Ok(GroupPageContext {
            group: GroupView::from_record(&group),
            paginator: Paginator::from_page(&page),
            cards: page.items.iter().map(PostCard::from_record).collect(),
        })
    }

    pub async fn profile_page(
        &self,
        username: &str,
        requested: Option<usize>,
        viewer: Option<Uuid>,
    ) -> Result<ProfileContext, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;
        let page = self
            .paged_posts(PostQueryFilter::by_author(author.id), requested)
            .await?;
        let follower_count = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;

        let viewer_is_author = viewer == Some(author.id);
        let viewer_follows = match viewer {
            Some(viewer_id) if !viewer_is_author => {
                self.follows.follow_exists(viewer_id, author.id).await?
            }
            _ => false,
        };

        Ok(ProfileContext {
            author_username: author.username,
            post_count: page.total_items,
            follower_count,
            following_count,
            viewer_is_author,
            viewer_follows,
            paginator: Paginator::from_page(&page),
            cards: page.items.iter().map(PostCard::from_record).collect(),
        })
    }

    /// Posts authored by people the viewer follows.
    pub async fn follow_page(
        &self,
        viewer: Uuid,
        requested: Option<usize>,
    ) -> Result<FollowFeedContext, FeedError> {
        let page = self
            .paged_posts(PostQueryFilter::followed_by(viewer), requested)
            .await?;
        Ok(FollowFeedContext {
            paginator: Paginator::from_page(&page),
            cards: page.items.iter().map(PostCard::from_record).collect(),
        })
    }

    pub async fn post_detail(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<PostDetailContext, FeedError> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(FeedError::UnknownPost)?;
        let author_post_count = self
            .posts
            .count_posts(&PostQueryFilter::by_author(post.author_id))
            .await?;
        let comments = self.comments.list_comments_for_post(post.id).await?;

        Ok(PostDetailContext {
            viewer_is_author: viewer == Some(post.author_id),
            author_post_count,
            comments: comments.iter().map(CommentView::from_record).collect(),
            comment_error: None,
            post: PostCard::from_record(&post),
        })
    }
}
