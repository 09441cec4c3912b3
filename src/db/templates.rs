//! Template document store

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::decode_error;
use crate::domain::templates::{Template, TemplateBom};

/// Database row for templates
#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    title: String,
    kind: String,
    tier: String,
    bom: Json<TemplateBom>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for Template {
    type Error = sqlx::Error;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            kind: row.kind.parse().map_err(|e| decode_error("kind", e))?,
            tier: row.tier.parse().map_err(|e| decode_error("tier", e))?,
            bom: row.bom.0,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, title, kind, tier, bom, created_by, created_at, updated_at";

pub async fn insert(pool: &PgPool, template: &Template) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO templates (id, title, kind, tier, bom, created_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(template.id)
    .bind(&template.title)
    .bind(template.kind.as_str())
    .bind(template.tier.as_str())
    .bind(Json(&template.bom))
    .bind(template.created_by)
    .bind(template.created_at)
    .bind(template.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<Template>, sqlx::Error> {
    let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
    sqlx::query_as::<_, TemplateRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Template::try_from)
        .transpose()
}

/// Page of templates, newest first, with the total count
pub async fn list(
    pool: &PgPool,
    limit: u32,
    offset: u32,
) -> Result<(Vec<Template>, u64), sqlx::Error> {
    let query = format!(
        "SELECT {COLUMNS} FROM templates ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, TemplateRow>(&query)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM templates")
        .fetch_one(pool)
        .await?;

    let templates = rows
        .into_iter()
        .map(Template::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((templates, total.max(0) as u64))
}

/// Overwrite the stored document; returns false if the template no longer exists
pub async fn save(pool: &PgPool, template: &Template) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE templates
        SET title = $2, kind = $3, tier = $4, bom = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(template.id)
    .bind(&template.title)
    .bind(template.kind.as_str())
    .bind(template.tier.as_str())
    .bind(Json(&template.bom))
    .bind(template.updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
