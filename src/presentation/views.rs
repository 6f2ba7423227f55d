use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::pagination::Paginated;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::posts::format_display_date;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Renders the shared error page without going through `HttpError`,
/// which itself relies on this function for its response body.
pub fn render_error_page(status: StatusCode, public_message: &'static str) -> Response {
    let template = ErrorTemplate {
        view: LayoutContext::new(
            LayoutChrome::anonymous(),
            ErrorPageView {
                status_code: status.as_u16(),
                message: public_message,
            },
        ),
    };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, public_message).into_response(),
    }
}

/// Data every page shares: the site title and the viewer's identity
/// for the navigation bar.
#[derive(Clone, Default)]
pub struct LayoutChrome {
    pub viewer_username: Option<String>,
}

impl LayoutChrome {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_viewer(username: impl Into<String>) -> Self {
        Self {
            viewer_username: Some(username.into()),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub chrome: LayoutChrome,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self { chrome, content }
    }
}

#[derive(Clone)]
pub struct Paginator {
    pub number: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_number: usize,
    pub next_number: usize,
}

impl Paginator {
    pub fn from_page<T>(page: &Paginated<T>) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages(),
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_number: page.previous_number(),
            next_number: page.next_number(),
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image_url: Option<String>,
    pub created_display: String,
    pub edited: bool,
}

impl PostCard {
    pub fn from_record(record: &PostRecord) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            author_username: record.author_username.clone(),
            group_slug: record.group_slug.clone(),
            group_title: record.group_title.clone(),
            image_url: record.image.as_ref().map(|path| format!("/media/{path}")),
            created_display: format_display_date(record.created),
            edited: record.modified.is_some(),
        }
    }
}

#[derive(Clone)]
pub struct GroupView {
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl GroupView {
    pub fn from_record(record: &GroupRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created_display: String,
}

impl CommentView {
    pub fn from_record(record: &CommentRecord) -> Self {
        Self {
            author_username: record.author_username.clone(),
            text: record.text.clone(),
            created_display: format_display_date(record.created),
        }
    }
}

#[derive(Clone)]
pub struct IndexContext {
    pub cards: Vec<PostCard>,
    pub paginator: Paginator,
}

#[derive(Clone)]
pub struct GroupPageContext {
    pub group: GroupView,
    pub cards: Vec<PostCard>,
    pub paginator: Paginator,
}

#[derive(Clone)]
pub struct ProfileContext {
    pub author_username: String,
    pub post_count: usize,
    pub follower_count: usize,
    pub following_count: usize,
    pub viewer_is_author: bool,
    pub viewer_follows: bool,
    pub cards: Vec<PostCard>,
    pub paginator: Paginator,
}

#[derive(Clone)]
pub struct FollowFeedContext {
    pub cards: Vec<PostCard>,
    pub paginator: Paginator,
}

#[derive(Clone)]
pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: usize,
    pub viewer_is_author: bool,
    pub comments: Vec<CommentView>,
    pub comment_error: Option<String>,
}

#[derive(Clone)]
pub struct GroupOption {
    pub id: Uuid,
    pub title: String,
}

/// Create/edit form state, re-rendered with the submitted values when
/// validation fails.
#[derive(Clone)]
pub struct PostFormContext {
    pub heading: &'static str,
    pub action: String,
    pub text: String,
    pub selected_group: Option<Uuid>,
    pub groups: Vec<GroupOption>,
    pub error: Option<String>,
}

impl PostFormContext {
    pub fn is_selected(&self, id: &Uuid) -> bool {
        self.selected_group.as_ref() == Some(id)
    }
}

#[derive(Clone)]
pub struct LoginContext {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SignupContext {
    pub username: String,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ErrorPageView {
    pub status_code: u16,
    pub message: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupPageContext>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FollowFeedContext>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
