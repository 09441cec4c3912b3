//! Material catalogue store

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Material;

const COLUMNS: &str = "id, description, unit, cost, created_at, updated_at";

pub async fn insert(pool: &PgPool, material: &Material) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO materials (id, description, unit, cost, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(material.id)
    .bind(&material.description)
    .bind(&material.unit)
    .bind(material.cost)
    .bind(material.created_at)
    .bind(material.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Material>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM materials WHERE id = $1");
    sqlx::query_as::<_, Material>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Material>, u64), sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM materials ORDER BY description LIMIT $1 OFFSET $2"
    );
    let materials = sqlx::query_as::<_, Material>(&query)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM materials")
        .fetch_one(pool)
        .await?;

    Ok((materials, total.max(0) as u64))
}

pub async fn save(pool: &PgPool, material: &Material) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE materials
        SET description = $2, unit = $3, cost = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(material.id)
    .bind(&material.description)
    .bind(&material.unit)
    .bind(material.cost)
    .bind(material.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM materials WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
