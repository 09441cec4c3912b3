//! Location domain types
//!
//! A location is a named markup zone applied on top of generated BOM costs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Location entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    /// Markup percentage, e.g. 12.5 for +12.5%
    pub markup: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Markup as a multiplier fraction (12.5% -> 0.125)
    pub fn markup_fraction(&self) -> f64 {
        self.markup / 100.0
    }
}

/// Request DTO for creating a location
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocationRequest {
    pub name: String,
    pub markup: f64,
}

/// Request DTO for updating a location
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLocationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub markup: Option<f64>,
}

pub fn is_valid_markup(markup: f64) -> bool {
    markup.is_finite() && markup >= 0.0
}
