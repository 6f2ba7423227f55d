//! HTTP surface: state, routes and middleware wiring.

pub mod auth;
pub mod authoring;
pub mod follows;
pub mod middleware;
pub mod public;

use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::application::auth::AuthService;
use crate::application::feed::FeedService;
use crate::application::follows::FollowService;
use crate::application::posts::PostService;
use crate::application::repos::GroupsRepo;
use crate::cache::{CacheState, page_cache_layer};
use crate::infra::db::PostgresRepositories;
use crate::infra::media::MediaStorage;

#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub posts: PostService,
    pub follows: FollowService,
    pub auth: AuthService,
    pub groups: Arc<dyn GroupsRepo>,
    pub media: Arc<MediaStorage>,
    pub cache: CacheState,
    pub db: Option<PostgresRepositories>,
}

pub fn router(state: AppState) -> Router {
    // Only the front page goes through the response cache.
    let cached_index = Router::new()
        .route("/", get(public::index))
        .route_layer(from_fn_with_state(state.cache.clone(), page_cache_layer));

    Router::new()
        .merge(cached_index)
        .route("/group/{slug}", get(public::group_posts))
        .route("/profile/{username}", get(public::profile))
        .route("/posts/{id}", get(public::post_detail))
        .route("/follow", get(public::follow_index))
        .route(
            "/create",
            get(authoring::create_form).post(authoring::create_submit),
        )
        .route(
            "/posts/{id}/edit",
            get(authoring::edit_form).post(authoring::edit_submit),
        )
        .route("/posts/{id}/delete", post(authoring::delete_post))
        .route("/posts/{id}/comment", post(authoring::add_comment))
        .route("/profile/{username}/follow", post(follows::follow))
        .route("/profile/{username}/unfollow", post(follows::unfollow))
        .route(
            "/auth/signup",
            get(auth::signup_form).post(auth::signup_submit),
        )
        .route("/auth/login", get(auth::login_form).post(auth::login_submit))
        .route("/auth/logout", post(auth::logout))
        .route("/media/{*path}", get(public::media))
        .route("/_health/db", get(public::db_health))
        .layer(from_fn(middleware::log_responses))
        .layer(from_fn(middleware::set_request_context))
        .with_state(state)
}
