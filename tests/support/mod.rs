//! In-memory fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use quaderno::application::auth::{AuthService, SessionStore, hash_password};
use quaderno::application::feed::FeedService;
use quaderno::application::follows::FollowService;
use quaderno::application::pagination::PageRequest;
use quaderno::application::posts::PostService;
use quaderno::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, NewComment, NewPost, NewUser, PostQueryFilter,
    PostUpdate, PostsRepo, RepoError, UsersRepo,
};
use quaderno::cache::{CacheConfig, CacheState, PageCache};
use quaderno::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord,
};
use quaderno::infra::http::{self, AppState};
use quaderno::infra::media::MediaStorage;

/// Repository fakes backed by plain vectors. Posts are kept newest
/// first so listings mirror the `created DESC` ordering of the real
/// queries.
#[derive(Default)]
pub struct InMemoryRepos {
    users: Mutex<Vec<UserRecord>>,
    groups: Mutex<Vec<GroupRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    follows: Mutex<Vec<FollowRecord>>,
}

impl InMemoryRepos {
    pub fn seed_user(&self, username: &str, password: &str) -> UserRecord {
        let salt = "fixed-salt".to_string();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(&salt, password),
            password_salt: salt,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn seed_group(&self, slug: &str, title: &str) -> GroupRecord {
        let group = GroupRecord {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: format!("About {title}"),
            created_at: OffsetDateTime::now_utc(),
        };
        self.groups.lock().unwrap().push(group.clone());
        group
    }

    pub fn seed_post(
        &self,
        author: &UserRecord,
        group: Option<&GroupRecord>,
        text: &str,
    ) -> PostRecord {
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            image: None,
            author_id: author.id,
            author_username: author.username.clone(),
            group_id: group.map(|g| g.id),
            group_slug: group.map(|g| g.slug.clone()),
            group_title: group.map(|g| g.title.clone()),
            created: OffsetDateTime::now_utc(),
            modified: None,
        };
        self.posts.lock().unwrap().insert(0, post.clone());
        post
    }

    pub fn seed_comment(
        &self,
        post: &PostRecord,
        author: &UserRecord,
        text: &str,
    ) -> CommentRecord {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            post_id: post.id,
            author_id: author.id,
            author_username: author.username.clone(),
            created: OffsetDateTime::now_utc(),
            modified: None,
        };
        self.comments.lock().unwrap().push(comment.clone());
        comment
    }

    pub fn seed_follow(&self, follower: &UserRecord, followed: &UserRecord) {
        self.follows.lock().unwrap().push(FollowRecord {
            id: Uuid::new_v4(),
            follower_id: follower.id,
            followed_id: followed.id,
            created_at: OffsetDateTime::now_utc(),
        });
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    /// Id of the single stored post; panics when the store holds more
    /// or fewer than one.
    pub fn only_post_id(&self) -> Uuid {
        let posts = self.posts.lock().unwrap();
        assert_eq!(posts.len(), 1, "expected exactly one stored post");
        posts[0].id
    }

    fn matches(&self, filter: &PostQueryFilter, post: &PostRecord) -> bool {
        if let Some(author_id) = filter.author_id {
            if post.author_id != author_id {
                return false;
            }
        }
        if let Some(group_id) = filter.group_id {
            if post.group_id != Some(group_id) {
                return false;
            }
        }
        if let Some(follower_id) = filter.followed_by {
            let follows = self.follows.lock().unwrap();
            if !follows
                .iter()
                .any(|f| f.follower_id == follower_id && f.followed_id == post.author_id)
            {
                return false;
            }
        }
        true
    }

    fn group_join(&self, group_id: Option<Uuid>) -> (Option<String>, Option<String>) {
        match group_id {
            None => (None, None),
            Some(id) => {
                let groups = self.groups.lock().unwrap();
                match groups.iter().find(|g| g.id == id) {
                    Some(group) => (Some(group.slug.clone()), Some(group.title.clone())),
                    None => (None, None),
                }
            }
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".into(),
            });
        }
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_salt: new_user.password_salt,
            password_hash: new_user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let groups = self.groups.lock().unwrap();
        Ok(groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn find_group_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        let groups = self.groups.lock().unwrap();
        Ok(groups.iter().find(|g| g.id == id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        Ok(self.groups.lock().unwrap().clone())
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap().clone();
        Ok(posts
            .into_iter()
            .filter(|post| self.matches(filter, post))
            .skip(page.offset())
            .take(page.size())
            .collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<usize, RepoError> {
        let posts = self.posts.lock().unwrap().clone();
        Ok(posts
            .iter()
            .filter(|post| self.matches(filter, post))
            .count())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let posts = self.posts.lock().unwrap();
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create_post(&self, new_post: NewPost) -> Result<PostRecord, RepoError> {
        let author_username = {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|u| u.id == new_post.author_id)
                .map(|u| u.username.clone())
                .ok_or_else(|| RepoError::Integrity {
                    message: "post author does not exist".into(),
                })?
        };
        let (group_slug, group_title) = self.group_join(new_post.group_id);
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: new_post.text,
            image: new_post.image,
            author_id: new_post.author_id,
            author_username,
            group_id: new_post.group_id,
            group_slug,
            group_title,
            created: OffsetDateTime::now_utc(),
            modified: None,
        };
        self.posts.lock().unwrap().insert(0, post.clone());
        Ok(post)
    }

    async fn update_post(&self, update: PostUpdate) -> Result<PostRecord, RepoError> {
        let (group_slug, group_title) = self.group_join(update.group_id);
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == update.id)
            .ok_or(RepoError::NotFound)?;
        post.text = update.text;
        post.group_id = update.group_id;
        post.group_slug = group_slug;
        post.group_title = group_title;
        if let Some(image) = update.image {
            post.image = Some(image);
        }
        post.modified = Some(OffsetDateTime::now_utc());
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts.lock().unwrap().retain(|p| p.id != id);
        self.comments.lock().unwrap().retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_comments_for_post(
        &self,
        post_id: Uuid,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let comments = self.comments.lock().unwrap();
        // Newest first, matching the descending order of the real query.
        Ok(comments
            .iter()
            .rev()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn create_comment(&self, new_comment: NewComment) -> Result<CommentRecord, RepoError> {
        let author_username = {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|u| u.id == new_comment.author_id)
                .map(|u| u.username.clone())
                .ok_or_else(|| RepoError::Integrity {
                    message: "comment author does not exist".into(),
                })?
        };
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            text: new_comment.text,
            post_id: new_comment.post_id,
            author_id: new_comment.author_id,
            author_username,
            created: OffsetDateTime::now_utc(),
            modified: None,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn create_follow(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<FollowRecord, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        if follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followed_id == followed_id)
        {
            return Err(RepoError::Duplicate {
                constraint: "follows_follower_followed_key".into(),
            });
        }
        let follow = FollowRecord {
            id: Uuid::new_v4(),
            follower_id,
            followed_id,
            created_at: OffsetDateTime::now_utc(),
        };
        follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete_follow(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        let before = follows.len();
        follows.retain(|f| !(f.follower_id == follower_id && f.followed_id == followed_id));
        Ok(follows.len() < before)
    }

    async fn follow_exists(
        &self,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, RepoError> {
        let follows = self.follows.lock().unwrap();
        Ok(follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followed_id == followed_id))
    }

    async fn count_followers(&self, user_id: Uuid) -> Result<usize, RepoError> {
        let follows = self.follows.lock().unwrap();
        Ok(follows.iter().filter(|f| f.followed_id == user_id).count())
    }

    async fn count_following(&self, user_id: Uuid) -> Result<usize, RepoError> {
        let follows = self.follows.lock().unwrap();
        Ok(follows.iter().filter(|f| f.follower_id == user_id).count())
    }
}

pub struct TestApp {
    pub repos: Arc<InMemoryRepos>,
    pub state: AppState,
    pub router: Router,
    _media_dir: tempfile::TempDir,
}

pub fn test_app() -> TestApp {
    app_with_cache(CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    })
}

pub fn app_with_cache(cache_config: CacheConfig) -> TestApp {
    let repos = Arc::new(InMemoryRepos::default());
    let media_dir = tempfile::tempdir().expect("media tempdir");
    let media =
        Arc::new(MediaStorage::new(media_dir.path().to_path_buf()).expect("media storage"));

    let users: Arc<dyn UsersRepo> = repos.clone();
    let groups: Arc<dyn GroupsRepo> = repos.clone();
    let posts: Arc<dyn PostsRepo> = repos.clone();
    let comments: Arc<dyn CommentsRepo> = repos.clone();
    let follows: Arc<dyn FollowsRepo> = repos.clone();

    let auth = AuthService::new(users.clone(), SessionStore::new());
    let feed = FeedService::new(
        posts.clone(),
        groups.clone(),
        users.clone(),
        comments.clone(),
        follows.clone(),
        10,
    );
    let post_service = PostService::new(posts, groups.clone(), comments, media.clone());
    let follow_service = FollowService::new(follows, users);

    let cache = CacheState {
        cache: Arc::new(PageCache::new(&cache_config)),
        config: cache_config,
    };

    let state = AppState {
        feed,
        posts: post_service,
        follows: follow_service,
        auth,
        groups,
        media,
        cache,
        db: None,
    };
    let router = http::router(state.clone());

    TestApp {
        repos,
        state,
        router,
        _media_dir: media_dir,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn get_as(app: &TestApp, uri: &str, cookie: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn post_form(app: &TestApp, uri: &str, cookie: Option<&str>, body: &str) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(body.to_string())).expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

const MULTIPART_BOUNDARY: &str = "qdrn-test-boundary";

/// Builds a multipart/form-data payload of plain text fields.
pub fn multipart_fields(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));
    body
}

pub async fn post_multipart(app: &TestApp, uri: &str, cookie: &str, body: String) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Extracts the `sessionid=<token>` pair from a Set-Cookie header.
pub fn session_cookie(response: &Response) -> Option<String> {
    let raw = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(str::to_owned)
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// Seeds an account and logs it in through the HTTP surface, returning
/// the Cookie header value for follow-up requests.
pub async fn login_as(app: &TestApp, username: &str, password: &str) -> String {
    app.repos.seed_user(username, password);
    let body = format!("username={username}&password={password}");
    let response = post_form(app, "/auth/login", None, &body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response).expect("login sets a session cookie")
}
