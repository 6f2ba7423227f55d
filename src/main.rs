use std::{process, sync::Arc};

use clap::Parser;
use quaderno::{
    application::{
        auth::{AuthService, SessionStore},
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, UsersRepo},
    },
    cache::{CacheConfig, CacheState, PageCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AppState},
        media::MediaStorage,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli = config::CliArgs::parse();
    let settings = config::load(&cli)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| AppError::unexpected("database.url is not configured"))?;
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(format!("failed to connect: {err}")))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(format!("failed to run migrations: {err}")))?;
    let repositories = PostgresRepositories::new(pool);
    info!("database ready");

    let media = Arc::new(MediaStorage::new(settings.media.directory.clone()).map_err(InfraError::from)?);

    let repos = Arc::new(repositories.clone());
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
        settings.feed.page_size.get(),
    );
    let post_service = PostService::new(
        posts.clone(),
        groups.clone(),
        comments.clone(),
        media.clone(),
    );
    let follow_service = FollowService::new(follows.clone(), users.clone());

    let cache_config = CacheConfig::from(&settings.cache);
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
        db: Some(repositories),
    };
    let router = http::router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to bind listener: {err}")))?;
    info!(addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received, draining connections");
    });

    // Bound the drain: once the signal fires, in-flight requests get
    // the configured grace period before the process gives up on them.
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "drain deadline exceeded, shutting down");
        }
    }

    Ok(())
}
