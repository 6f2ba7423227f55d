//! Follow and unfollow handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::application::error::HttpError;
use crate::application::follows::FollowError;

use super::AppState;
use super::auth::RequireUser;

fn map_follow_error(source: &'static str, error: FollowError) -> HttpError {
    match error {
        FollowError::UnknownUser => HttpError::not_found(source, "author does not exist"),
        FollowError::SelfFollow => HttpError::new(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "You cannot follow yourself",
            "self-follow rejected",
        ),
        FollowError::Repo(err) => HttpError::internal(source, &err),
    }
}

pub async fn follow(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    state
        .follows
        .follow(auth.session.user_id, &username)
        .await
        .map_err(|err| map_follow_error("infra::http::follows::follow", err))?;
    Ok(Redirect::to(&format!("/profile/{username}")).into_response())
}

pub async fn unfollow(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    state
        .follows
        .unfollow(auth.session.user_id, &username)
        .await
        .map_err(|err| map_follow_error("infra::http::follows::unfollow", err))?;
    Ok(Redirect::to(&format!("/profile/{username}")).into_response())
}
