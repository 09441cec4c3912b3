//! Canonical material records
//!
//! Template lines may reference a catalogue entry for their description, unit and cost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Material catalogue entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub description: String,
    pub unit: String,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a material
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialRequest {
    pub description: String,
    pub unit: String,
    pub cost: f64,
}

/// Request DTO for updating a material
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMaterialRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}
