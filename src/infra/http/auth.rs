//! Session extraction and the signup/login/logout handlers.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query, State},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::application::auth::{AuthError, SESSION_COOKIE, Session};
use crate::presentation::views::{
    LayoutChrome, LayoutContext, LoginContext, LoginTemplate, SignupContext, SignupTemplate,
    render_template_response,
};

use super::AppState;

/// A validated session together with the token it came from, so logout
/// can revoke it.
#[derive(Clone)]
pub struct AuthSession {
    pub token: String,
    pub session: Session,
}

fn session_from_parts(parts: &Parts, state: &AppState) -> Option<AuthSession> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            let session = state.auth.sessions().get(value)?;
            return Some(AuthSession {
                token: value.to_string(),
                session,
            });
        }
    }
    None
}

/// Optional viewer identity; never rejects.
#[derive(Clone)]
pub struct CurrentUser(pub Option<AuthSession>);

impl CurrentUser {
    pub fn chrome(&self) -> LayoutChrome {
        match &self.0 {
            Some(auth) => LayoutChrome::for_viewer(auth.session.username.clone()),
            None => LayoutChrome::anonymous(),
        }
    }

    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|auth| auth.session.user_id)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(session_from_parts(parts, state)))
    }
}

/// Rejects anonymous requests with a redirect to the login form,
/// preserving the requested path.
pub struct RequireUser(pub AuthSession);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_from_parts(parts, state) {
            Some(auth) => Ok(Self(auth)),
            None => {
                let next = parts.uri.path();
                Err(Redirect::to(&format!("/auth/login?next={next}")).into_response())
            }
        }
    }
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Only same-site relative targets are honoured after login.
fn sanitize_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

pub async fn login_form(
    State(_state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    if current.0.is_some() {
        return Redirect::to("/").into_response();
    }
    let context = LoginContext {
        username: String::new(),
        next: sanitize_next(query.next.as_deref()).to_string(),
        error: None,
    };
    render_template_response(
        LoginTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    )
}

pub async fn login_submit(
    State(state): State<AppState>,
    axum::extract::Form(form): axum::extract::Form<LoginForm>,
) -> Response {
    match state.auth.login(&form.username, &form.password).await {
        Ok(user) => {
            let token = state.auth.sessions().create(&user);
            let next = sanitize_next(form.next.as_deref()).to_string();
            (
                [(header::SET_COOKIE, session_cookie(&token))],
                Redirect::to(&next),
            )
                .into_response()
        }
        Err(error) => {
            let context = LoginContext {
                username: form.username,
                next: sanitize_next(form.next.as_deref()).to_string(),
                error: Some(error.to_string()),
            };
            render_template_response(
                LoginTemplate {
                    view: LayoutContext::new(LayoutChrome::anonymous(), context),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
    }
}

pub async fn signup_form(current: CurrentUser) -> Response {
    if current.0.is_some() {
        return Redirect::to("/").into_response();
    }
    let context = SignupContext {
        username: String::new(),
        error: None,
    };
    render_template_response(
        SignupTemplate {
            view: LayoutContext::new(current.chrome(), context),
        },
        StatusCode::OK,
    )
}

pub async fn signup_submit(
    State(state): State<AppState>,
    axum::extract::Form(form): axum::extract::Form<SignupForm>,
) -> Response {
    match state.auth.signup(&form.username, &form.password).await {
        Ok(user) => {
            let token = state.auth.sessions().create(&user);
            (
                [(header::SET_COOKIE, session_cookie(&token))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(error @ (AuthError::UsernameTaken | AuthError::Validation(_))) => {
            let context = SignupContext {
                username: form.username,
                error: Some(error.to_string()),
            };
            render_template_response(
                SignupTemplate {
                    view: LayoutContext::new(LayoutChrome::anonymous(), context),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(error) => crate::application::error::HttpError::internal(
            "infra::http::auth::signup_submit",
            &error,
        )
        .into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Response {
    if let Some(auth) = current.0 {
        state.auth.sessions().remove(&auth.token);
    }
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}
