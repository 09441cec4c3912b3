//! Location store

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Location;

const COLUMNS: &str = "id, name, markup, created_at, updated_at";

pub async fn insert(pool: &PgPool, location: &Location) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO locations (id, name, markup, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(location.id)
    .bind(&location.name)
    .bind(location.markup)
    .bind(location.created_at)
    .bind(location.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Location>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM locations WHERE id = $1");
    sqlx::query_as::<_, Location>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Lookup by name, ignoring case
pub async fn fetch_by_name(pool: &PgPool, name: &str) -> Result<Option<Location>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM locations WHERE LOWER(name) = LOWER($1)");
    sqlx::query_as::<_, Location>(&query)
        .bind(name.trim())
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM locations ORDER BY name");
    sqlx::query_as::<_, Location>(&query).fetch_all(pool).await
}

pub async fn save(pool: &PgPool, location: &Location) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE locations SET name = $2, markup = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(location.id)
    .bind(&location.name)
    .bind(location.markup)
    .bind(location.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a location, returning its name when a row was removed
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("DELETE FROM locations WHERE id = $1 RETURNING name")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Postgres unique violation, raised for a duplicate location name
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
