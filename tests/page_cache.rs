//! Front page response cache behaviour.

mod support;

use axum::http::StatusCode;
use quaderno::cache::CacheConfig;

use support::{
    app_with_cache, body_string, get, get_as, login_as, multipart_fields, post_form,
    post_multipart, test_app,
};

#[tokio::test]
async fn index_is_served_from_cache_within_ttl() {
    let app = app_with_cache(CacheConfig::default());
    let author = app.repos.seed_user("poet", "long-password");
    app.repos.seed_post(&author, None, "cached-entry");

    let first = body_string(get(&app, "/").await).await;
    assert!(first.contains("cached-entry"));
    assert_eq!(app.state.cache.cache.len(), 1);

    // A write inside the TTL is invisible on the front page.
    app.repos.seed_post(&author, None, "later-entry");
    let second = body_string(get(&app, "/").await).await;
    assert_eq!(first, second);
    assert!(!second.contains("later-entry"));
}

#[tokio::test]
async fn clearing_the_cache_makes_new_posts_visible() {
    let app = app_with_cache(CacheConfig::default());
    let author = app.repos.seed_user("poet", "long-password");
    app.repos.seed_post(&author, None, "cached-entry");

    let _ = get(&app, "/").await;
    app.repos.seed_post(&author, None, "later-entry");

    app.state.cache.cache.clear();
    let body = body_string(get(&app, "/").await).await;
    assert!(body.contains("later-entry"));
}

#[tokio::test]
async fn expired_entries_are_refreshed() {
    let app = app_with_cache(CacheConfig {
        ttl_seconds: 0,
        ..CacheConfig::default()
    });
    let author = app.repos.seed_user("poet", "long-password");
    app.repos.seed_post(&author, None, "cached-entry");

    let _ = get(&app, "/").await;
    app.repos.seed_post(&author, None, "later-entry");

    let body = body_string(get(&app, "/").await).await;
    assert!(body.contains("later-entry"));
}

#[tokio::test]
async fn disabled_cache_always_rerenders() {
    let app = test_app();
    let author = app.repos.seed_user("poet", "long-password");
    app.repos.seed_post(&author, None, "cached-entry");

    let _ = get(&app, "/").await;
    assert!(app.state.cache.cache.is_empty());

    app.repos.seed_post(&author, None, "later-entry");
    let body = body_string(get(&app, "/").await).await;
    assert!(body.contains("later-entry"));
}

#[tokio::test]
async fn only_the_front_page_is_cached() {
    let app = app_with_cache(CacheConfig::default());
    let author = app.repos.seed_user("poet", "long-password");
    let group = app.repos.seed_group("verse", "Verse");
    app.repos.seed_post(&author, Some(&group), "grouped-entry");

    let _ = get(&app, "/group/verse").await;
    app.repos.seed_post(&author, Some(&group), "later-entry");

    let body = body_string(get(&app, "/group/verse").await).await;
    assert!(body.contains("later-entry"));

    let body = body_string(get(&app, "/profile/poet").await).await;
    assert!(body.contains("later-entry"));
}

#[tokio::test]
async fn logged_in_renders_bypass_the_cache() {
    let app = app_with_cache(CacheConfig::default());
    let cookie = login_as(&app, "alice", "long-password").await;

    // A logged-in render carries personal chrome and is never stored.
    let body = body_string(get_as(&app, "/", &cookie).await).await;
    assert!(body.contains("alice"));
    assert!(app.state.cache.cache.is_empty());

    // The shared copy comes from an anonymous render.
    let anonymous = body_string(get(&app, "/").await).await;
    assert!(!anonymous.contains("alice"));
    assert_eq!(app.state.cache.cache.len(), 1);

    // And that shared copy is not replayed to the session either.
    let body = body_string(get_as(&app, "/", &cookie).await).await;
    assert!(body.contains("alice"));
}

#[tokio::test]
async fn deleting_a_post_inside_the_ttl_keeps_the_cached_index() {
    let app = app_with_cache(CacheConfig::default());
    let cookie = login_as(&app, "poet", "long-password").await;
    let form = multipart_fields(&[("text", "doomed-entry")]);
    let _ = post_multipart(&app, "/create", &cookie, form).await;
    let post_id = app.repos.only_post_id();

    let first = body_string(get(&app, "/").await).await;
    assert!(first.contains("doomed-entry"));

    let response = post_form(&app, &format!("/posts/{post_id}/delete"), Some(&cookie), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.repos.post_count(), 0);

    // The stale copy survives until the cache is cleared or expires.
    let second = body_string(get(&app, "/").await).await;
    assert_eq!(first, second);

    app.state.cache.cache.clear();
    let third = body_string(get(&app, "/").await).await;
    assert!(!third.contains("doomed-entry"));
}

#[tokio::test]
async fn only_successful_front_page_loads_populate_the_cache() {
    let app = app_with_cache(CacheConfig::default());

    let response = get(&app, "/group/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.state.cache.cache.is_empty());

    let _ = get(&app, "/").await;
    assert_eq!(app.state.cache.cache.len(), 1);
}
