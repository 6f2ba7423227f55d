use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{NewPost, PostQueryFilter, PostUpdate, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    text: String,
    image: Option<String>,
    author_id: Uuid,
    author_username: String,
    group_id: Option<Uuid>,
    group_slug: Option<String>,
    group_title: Option<String>,
    created: OffsetDateTime,
    modified: Option<OffsetDateTime>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            image: row.image,
            author_id: row.author_id,
            author_username: row.author_username,
            group_id: row.group_id,
            group_slug: row.group_slug,
            group_title: row.group_title,
            created: row.created,
            modified: row.modified,
        }
    }
}

const SELECT_POSTS: &str = "SELECT p.id, p.text, p.image, p.author_id, \
    u.username AS author_username, p.group_id, g.slug AS group_slug, \
    g.title AS group_title, p.created, p.modified \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN groups g ON g.id = p.group_id \
    WHERE 1 = 1";

fn apply_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q PostQueryFilter) {
    if let Some(author_id) = filter.author_id {
        qb.push(" AND p.author_id = ");
        qb.push_bind(author_id);
    }
    if let Some(group_id) = filter.group_id {
        qb.push(" AND p.group_id = ");
        qb.push_bind(group_id);
    }
    if let Some(follower_id) = filter.followed_by {
        qb.push(
            " AND EXISTS (SELECT 1 FROM follows f \
             WHERE f.follower_id = ",
        );
        qb.push_bind(follower_id);
        qb.push(" AND f.followed_id = p.author_id)");
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(SELECT_POSTS);
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created DESC, p.id DESC LIMIT ");
        qb.push_bind(page.size() as i64);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset() as i64);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<usize, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1 = 1");
        apply_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{SELECT_POSTS} AND p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn create_post(&self, new_post: NewPost) -> Result<PostRecord, RepoError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (text, image, author_id, group_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&new_post.text)
        .bind(&new_post.image)
        .bind(new_post.author_id)
        .bind(new_post.group_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn update_post(&self, update: PostUpdate) -> Result<PostRecord, RepoError> {
        // COALESCE keeps the stored image when no replacement arrived.
        let affected = sqlx::query(
            "UPDATE posts SET text = $1, group_id = $2, \
             image = COALESCE($3, image), modified = now() WHERE id = $4",
        )
        .bind(&update.text)
        .bind(update.group_id)
        .bind(&update.image)
        .bind(update.id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if affected == 0 {
            return Err(RepoError::NotFound);
        }
        self.find_post(update.id).await?.ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        if affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
