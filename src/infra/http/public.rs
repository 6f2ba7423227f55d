//! Read-only pages: feeds, post details, media and health.

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::presentation::views::{
    FollowTemplate, GroupTemplate, IndexTemplate, LayoutContext, PostDetailTemplate,
    ProfileTemplate, render_template_response,
};

use super::AppState;
use super::auth::{CurrentUser, RequireUser};

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Non-numeric values fall back to the first page; out-of-range
    /// numbers are clamped later.
    fn number(&self) -> Option<usize> {
        self.page.as_deref().and_then(|raw| raw.parse().ok())
    }
}

pub(super) fn parse_post_id(raw: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpError::not_found(
            "infra::http::public::parse_post_id",
            format!("`{raw}` is not a valid post id"),
        )
    })
}

pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let context = state.feed.index_page(query.number()).await?;
    Ok(render_template_response(
        IndexTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    ))
}

pub async fn group_posts(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let context = state.feed.group_page(&slug, query.number()).await?;
    Ok(render_template_response(
        GroupTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let context = state
        .feed
        .profile_page(&username, query.number(), current.user_id())
        .await?;
    Ok(render_template_response(
        ProfileTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    ))
}

pub async fn post_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)?;
    let context = state.feed.post_detail(post_id, current.user_id()).await?;
    Ok(render_template_response(
        PostDetailTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    ))
}

pub async fn follow_index(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let context = state
        .feed
        .follow_page(auth.session.user_id, query.number())
        .await?;
    Ok(render_template_response(
        FollowTemplate {
            view: LayoutContext::new(
                crate::presentation::views::LayoutChrome::for_viewer(auth.session.username),
                context,
            ),
        },
        StatusCode::OK,
    ))
}

pub async fn media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, HttpError> {
    let bytes = state
        .media
        .load(&path)
        .await
        .map_err(|err| {
            HttpError::not_found("infra::http::public::media", err.to_string())
        })?
        .ok_or_else(|| {
            HttpError::not_found(
                "infra::http::public::media",
                format!("no stored file at `{path}`"),
            )
        })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    // Stored names embed a fresh token, so the content behind a path
    // never changes and clients may cache it indefinitely.
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn health_body(status: StatusCode, database: &str) -> Response {
    let body = serde_json::json!({ "database": database });
    (status, axum::Json(body)).into_response()
}

pub async fn db_health(State(state): State<AppState>) -> Response {
    match &state.db {
        Some(db) => match db.health_check().await {
            Ok(()) => health_body(StatusCode::OK, "ok"),
            Err(err) => {
                let mut response = health_body(StatusCode::SERVICE_UNAVAILABLE, "unavailable");
                crate::application::error::ErrorReport::from_error(
                    "infra::http::public::db_health",
                    StatusCode::SERVICE_UNAVAILABLE,
                    &err,
                )
                .attach(&mut response);
                response
            }
        },
        None => health_body(StatusCode::SERVICE_UNAVAILABLE, "not configured"),
    }
}
