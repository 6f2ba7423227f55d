//! Post and comment write handlers.

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::posts::{ImageUpload, PostActionError, PostInput};
use crate::presentation::views::{
    GroupOption, LayoutChrome, LayoutContext, PostDetailTemplate, PostFormContext,
    PostFormTemplate, render_template_response,
};

use super::AppState;
use super::auth::{AuthSession, RequireUser};
use super::public::parse_post_id;

/// Raw multipart payload of the create/edit form.
#[derive(Debug, Default)]
struct RawPostForm {
    text: String,
    group: Option<String>,
    image: Option<ImageUpload>,
}

impl RawPostForm {
    /// A group value that is not a well-formed id re-renders as a
    /// validation failure rather than a server error.
    fn group_id(&self) -> Result<Option<Uuid>, String> {
        match self.group.as_deref() {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| "selected group does not exist".to_string()),
        }
    }
}

fn bad_payload(error: &dyn std::error::Error) -> HttpError {
    HttpError::from_error(
        "infra::http::authoring::parse_post_form",
        StatusCode::BAD_REQUEST,
        "Malformed form payload",
        error,
    )
}

async fn parse_post_form(multipart: &mut Multipart) -> Result<RawPostForm, HttpError> {
    let mut form = RawPostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| bad_payload(&err))?
    {
        match field.name() {
            Some("text") => {
                form.text = field.text().await.map_err(|err| bad_payload(&err))?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| bad_payload(&err))?;
                if !value.is_empty() {
                    form.group = Some(value);
                }
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(|err| bad_payload(&err))?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn group_options(state: &AppState) -> Result<Vec<GroupOption>, HttpError> {
    let groups = state.groups.list_groups().await?;
    Ok(groups
        .into_iter()
        .map(|group| GroupOption {
            id: group.id,
            title: group.title,
        })
        .collect())
}

struct FormPage {
    heading: &'static str,
    action: String,
    text: String,
    selected_group: Option<Uuid>,
    error: Option<String>,
    status: StatusCode,
}

async fn render_post_form(
    state: &AppState,
    auth: &AuthSession,
    page: FormPage,
) -> Result<Response, HttpError> {
    let context = PostFormContext {
        heading: page.heading,
        action: page.action,
        text: page.text,
        selected_group: page.selected_group,
        groups: group_options(state).await?,
        error: page.error,
    };
    Ok(render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(
                LayoutChrome::for_viewer(auth.session.username.clone()),
                context,
            ),
        },
        page.status,
    ))
}

fn map_action_error(source: &'static str, error: PostActionError) -> HttpError {
    match error {
        PostActionError::NotFound => HttpError::not_found(source, "post does not exist"),
        PostActionError::NotAuthor => HttpError::forbidden(source, "actor is not the post author"),
        other => HttpError::internal(source, &other),
    }
}

pub async fn create_form(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
) -> Result<Response, HttpError> {
    render_post_form(
        &state,
        &auth,
        FormPage {
            heading: "New post",
            action: "/create".to_string(),
            text: String::new(),
            selected_group: None,
            error: None,
            status: StatusCode::OK,
        },
    )
    .await
}

pub async fn create_submit(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let form = parse_post_form(&mut multipart).await?;

    let group_id = match form.group_id() {
        Ok(group_id) => group_id,
        Err(message) => {
            return render_post_form(
                &state,
                &auth,
                FormPage {
                    heading: "New post",
                    action: "/create".to_string(),
                    text: form.text,
                    selected_group: None,
                    error: Some(message),
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                },
            )
            .await;
        }
    };

    let input = PostInput {
        text: form.text.clone(),
        group_id,
        image: form.image,
    };

    match state.posts.create(auth.session.user_id, input).await {
        Ok(_) => Ok(Redirect::to(&format!("/profile/{}", auth.session.username)).into_response()),
        Err(error @ (PostActionError::Validation(_) | PostActionError::UnknownGroup)) => {
            render_post_form(
                &state,
                &auth,
                FormPage {
                    heading: "New post",
                    action: "/create".to_string(),
                    text: form.text,
                    selected_group: group_id,
                    error: Some(error.to_string()),
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                },
            )
            .await
        }
        Err(error) => Err(map_action_error(
            "infra::http::authoring::create_submit",
            error,
        )),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)?;
    let post = state
        .posts
        .get_owned(auth.session.user_id, post_id)
        .await
        .map_err(|err| map_action_error("infra::http::authoring::edit_form", err))?;

    render_post_form(
        &state,
        &auth,
        FormPage {
            heading: "Edit post",
            action: format!("/posts/{post_id}/edit"),
            text: post.text,
            selected_group: post.group_id,
            error: None,
            status: StatusCode::OK,
        },
    )
    .await
}

pub async fn edit_submit(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)?;
    let form = parse_post_form(&mut multipart).await?;

    let group_id = match form.group_id() {
        Ok(group_id) => group_id,
        Err(message) => {
            return render_post_form(
                &state,
                &auth,
                FormPage {
                    heading: "Edit post",
                    action: format!("/posts/{post_id}/edit"),
                    text: form.text,
                    selected_group: None,
                    error: Some(message),
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                },
            )
            .await;
        }
    };

    let input = PostInput {
        text: form.text.clone(),
        group_id,
        image: form.image,
    };

    match state.posts.edit(auth.session.user_id, post_id, input).await {
        Ok(post) => Ok(Redirect::to(&format!("/posts/{}", post.id)).into_response()),
        Err(error @ (PostActionError::Validation(_) | PostActionError::UnknownGroup)) => {
            render_post_form(
                &state,
                &auth,
                FormPage {
                    heading: "Edit post",
                    action: format!("/posts/{post_id}/edit"),
                    text: form.text,
                    selected_group: group_id,
                    error: Some(error.to_string()),
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                },
            )
            .await
        }
        Err(error) => Err(map_action_error(
            "infra::http::authoring::edit_submit",
            error,
        )),
    }
}

pub async fn delete_post(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)?;
    state
        .posts
        .delete(auth.session.user_id, post_id)
        .await
        .map_err(|err| map_action_error("infra::http::authoring::delete_post", err))?;
    Ok(Redirect::to(&format!("/profile/{}", auth.session.username)).into_response())
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub text: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    RequireUser(auth): RequireUser,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&id)?;

    match state
        .posts
        .add_comment(auth.session.user_id, post_id, &form.text)
        .await
    {
        Ok(_) => Ok(Redirect::to(&format!("/posts/{post_id}")).into_response()),
        Err(PostActionError::Validation(message)) => {
            let mut context = state
                .feed
                .post_detail(post_id, Some(auth.session.user_id))
                .await?;
            context.comment_error = Some(message);
            Ok(render_template_response(
                PostDetailTemplate {
                    view: LayoutContext::new(
                        LayoutChrome::for_viewer(auth.session.username.clone()),
                        context,
                    ),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ))
        }
        Err(error) => Err(map_action_error(
            "infra::http::authoring::add_comment",
            error,
        )),
    }
}
