//! Template domain types
//!
//! A template is a reference bill of materials priced for a baseline building.
//! Generated BOMs scale it to a target building (see `domain::bom`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::materials::Material;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Category '{0}' not found")]
    CategoryNotFound(String),

    #[error("Material '{0}' not found in the category")]
    MaterialNotFound(String),

    #[error("Quantity must be a positive number")]
    InvalidQuantity,

    #[error("Cost must be zero or a positive number")]
    InvalidCost,

    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("Material requires a description, unit and cost")]
    IncompleteMaterial,

    #[error("Reference dimension '{0}' must be greater than zero")]
    InvalidReference(&'static str),

    #[error("Unknown template tier '{0}'")]
    UnknownTier(String),

    #[error("Unknown template type '{0}'")]
    UnknownKind(String),
}

/// Template building type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    Residential,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Residential => "residential",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "residential" => Ok(Self::Residential),
            other => Err(TemplateError::UnknownKind(other.to_string())),
        }
    }
}

/// Template pricing tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateTier {
    Economy,
    Standard,
    Premium,
}

impl TemplateTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateTier::Economy => "economy",
            TemplateTier::Standard => "standard",
            TemplateTier::Premium => "premium",
        }
    }

    /// Capitalised label appended to template titles
    pub fn label(&self) -> &'static str {
        match self {
            TemplateTier::Economy => "Economy",
            TemplateTier::Standard => "Standard",
            TemplateTier::Premium => "Premium",
        }
    }
}

impl FromStr for TemplateTier {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(Self::Economy),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            other => Err(TemplateError::UnknownTier(other.to_string())),
        }
    }
}

/// Scaling category of a template section.
///
/// Each kind selects the multiplier formula applied to its materials when a
/// template is scaled. Names that match no kind scale with the composite factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Earthwork,
    Concrete,
    Rebars,
    Formworks,
    Scaffoldings,
    Masonry,
    ArchitecturalTiles,
    ArchitecturalPainting,
    Roofing,
    DoorsAndWindows,
    Electrical,
    Plumbing,
    SepticTankAndCatchBasins,
    Other,
}

impl CategoryKind {
    /// Every named category, in the order new templates list them
    pub const STANDARD: [CategoryKind; 13] = [
        CategoryKind::Earthwork,
        CategoryKind::Concrete,
        CategoryKind::Rebars,
        CategoryKind::Formworks,
        CategoryKind::Scaffoldings,
        CategoryKind::Masonry,
        CategoryKind::ArchitecturalTiles,
        CategoryKind::ArchitecturalPainting,
        CategoryKind::Roofing,
        CategoryKind::DoorsAndWindows,
        CategoryKind::Electrical,
        CategoryKind::Plumbing,
        CategoryKind::SepticTankAndCatchBasins,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CategoryKind::Earthwork => "Earthwork",
            CategoryKind::Concrete => "Concrete",
            CategoryKind::Rebars => "Rebars",
            CategoryKind::Formworks => "Formworks",
            CategoryKind::Scaffoldings => "Scaffoldings",
            CategoryKind::Masonry => "Masonry",
            CategoryKind::ArchitecturalTiles => "Architectural - Tiles",
            CategoryKind::ArchitecturalPainting => "Architectural - Painting",
            CategoryKind::Roofing => "Roofing",
            CategoryKind::DoorsAndWindows => "Doors and Windows",
            CategoryKind::Electrical => "Electrical",
            CategoryKind::Plumbing => "Plumbing",
            CategoryKind::SepticTankAndCatchBasins => "Septic Tank and Catch Basins",
            CategoryKind::Other => "Other",
        }
    }

    /// Resolve a stored category name (case and spacing insensitive).
    ///
    /// "Architectural - Tiles" and "architectural-tiles" resolve to the same kind.
    pub fn from_name(name: &str) -> Self {
        let key = normalize_category_name(name);
        Self::STANDARD
            .into_iter()
            .find(|kind| normalize_category_name(kind.display_name()) == key)
            .unwrap_or(CategoryKind::Other)
    }
}

fn normalize_category_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(" - ", "-")
        .replace(" -", "-")
        .replace("- ", "-")
}

/// Units accepted on template materials
pub const KNOWN_UNITS: &[&str] = &[
    "lot", "cu.m", "bags", "pcs", "shts", "kgs", "gal", "gals", "liters", "set", "sets", "m",
    "L-m", "sheets", "pieces", "meters", "units", "bar", "tin", "tubes", "boxes",
];

/// Units counted in whole items; scaled quantities round up
pub const DISCRETE_UNITS: &[&str] = &[
    "bags", "pieces", "units", "gals", "gal", "pcs", "shts", "sheets", "set", "sets", "lot",
    "cu.m", "m", "L-m", "meters", "bar", "tin", "tubes", "boxes",
];

pub fn is_known_unit(unit: &str) -> bool {
    let unit = unit.trim();
    KNOWN_UNITS.iter().any(|u| u.eq_ignore_ascii_case(unit))
}

pub fn is_discrete_unit(unit: &str) -> bool {
    let unit = unit.trim();
    DISCRETE_UNITS.iter().any(|u| u.eq_ignore_ascii_case(unit))
}

/// Per-material scaling descriptor.
///
/// `room_count_factor` and `foundation_depth_factor` opt a material into an
/// extra multiplier layered on top of its category rule. The area and height
/// flags are carried with the document but the category rule already covers them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialScaling {
    #[serde(default = "enabled", deserialize_with = "de_flag")]
    pub area_factor: bool,
    #[serde(default = "enabled", deserialize_with = "de_flag")]
    pub height_factor: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub room_count_factor: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub foundation_depth_factor: bool,
}

impl Default for MaterialScaling {
    fn default() -> Self {
        Self {
            area_factor: true,
            height_factor: true,
            room_count_factor: false,
            foundation_depth_factor: false,
        }
    }
}

fn enabled() -> bool {
    true
}

/// Flags arrive either as booleans or as 0/1 numbers
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0.0,
    })
}

/// Material line bound to a template category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateMaterial {
    /// Hierarchical item code, "section.index"
    pub item: String,
    #[serde(default)]
    pub material_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    /// Unit cost
    pub cost: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub scaling: MaterialScaling,
}

impl TemplateMaterial {
    pub fn recompute_total(&mut self) {
        self.total_amount = self.quantity * self.cost;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub category: String,
    #[serde(default)]
    pub materials: Vec<TemplateMaterial>,
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        CategoryKind::from_name(&self.category)
    }
}

/// Dimensions of the baseline building a template is priced for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceBuilding {
    pub total_area: f64,
    pub num_floors: u32,
    pub avg_floor_height: f64,
    pub room_count: u32,
    pub foundation_depth: f64,
}

impl ReferenceBuilding {
    /// Every dimension is a scaling denominator and must be positive
    pub fn validate(&self) -> Result<(), TemplateError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.total_area) {
            return Err(TemplateError::InvalidReference("total_area"));
        }
        if self.num_floors == 0 {
            return Err(TemplateError::InvalidReference("num_floors"));
        }
        if !positive(self.avg_floor_height) {
            return Err(TemplateError::InvalidReference("avg_floor_height"));
        }
        if self.room_count == 0 {
            return Err(TemplateError::InvalidReference("room_count"));
        }
        if !positive(self.foundation_depth) {
            return Err(TemplateError::InvalidReference("foundation_depth"));
        }
        Ok(())
    }
}

/// Reference BOM stored on a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateBom {
    #[serde(flatten)]
    pub reference: ReferenceBuilding,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl TemplateBom {
    /// Empty BOM listing every standard category
    pub fn with_standard_categories(reference: ReferenceBuilding) -> Self {
        Self {
            reference,
            categories: CategoryKind::STANDARD
                .iter()
                .map(|kind| Category {
                    category: kind.display_name().to_string(),
                    materials: Vec::new(),
                })
                .collect(),
        }
    }

    fn category_position(&self, name: &str) -> Result<usize, TemplateError> {
        self.categories
            .iter()
            .position(|c| c.category.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| TemplateError::CategoryNotFound(name.to_string()))
    }

    /// Append a material to a category, numbering it after the existing lines
    pub fn add_material(
        &mut self,
        category_name: &str,
        input: NewMaterial,
    ) -> Result<&TemplateMaterial, TemplateError> {
        let position = self.category_position(category_name)?;

        if !(input.quantity.is_finite() && input.quantity > 0.0) {
            return Err(TemplateError::InvalidQuantity);
        }
        if !(input.cost.is_finite() && input.cost >= 0.0) {
            return Err(TemplateError::InvalidCost);
        }
        if !is_known_unit(&input.unit) {
            return Err(TemplateError::UnknownUnit(input.unit));
        }

        let category = &mut self.categories[position];
        let index = category.materials.len();
        let item = format!("{}.{}", position + 1, index + 1);
        let total_amount = round_cents(input.quantity * input.cost);

        category.materials.push(TemplateMaterial {
            item,
            material_id: input.material_id,
            description: input.description,
            quantity: input.quantity,
            unit: input.unit.trim().to_string(),
            cost: input.cost,
            total_amount,
            scaling: input.scaling,
        });

        Ok(&category.materials[index])
    }

    /// Remove the first material whose description matches (case-insensitive)
    pub fn remove_material(
        &mut self,
        category_name: &str,
        description: &str,
    ) -> Result<TemplateMaterial, TemplateError> {
        let position = self.category_position(category_name)?;
        let category = &mut self.categories[position];

        let index = category
            .materials
            .iter()
            .position(|m| m.description.eq_ignore_ascii_case(description))
            .ok_or_else(|| TemplateError::MaterialNotFound(description.to_string()))?;

        Ok(category.materials.remove(index))
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Fully resolved material line ready to be added to a category
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub material_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub cost: f64,
    pub scaling: MaterialScaling,
}

impl NewMaterial {
    /// Resolve a request against an optional catalogue entry.
    ///
    /// A catalogue entry supplies description and unit; its cost applies unless overridden.
    pub fn resolve(
        req: AddMaterialRequest,
        catalogue: Option<&Material>,
    ) -> Result<Self, TemplateError> {
        let (description, unit, cost) = match catalogue {
            Some(m) => (
                m.description.clone(),
                m.unit.clone(),
                req.cost.unwrap_or(m.cost),
            ),
            None => (
                req.description.ok_or(TemplateError::IncompleteMaterial)?,
                req.unit.ok_or(TemplateError::IncompleteMaterial)?,
                req.cost.ok_or(TemplateError::IncompleteMaterial)?,
            ),
        };

        Ok(Self {
            material_id: catalogue.map(|m| m.id),
            description,
            quantity: req.quantity,
            unit,
            cost,
            scaling: req.scaling.unwrap_or_default(),
        })
    }
}

/// Template entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    pub tier: TemplateTier,
    pub bom: TemplateBom,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a template
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    pub tier: TemplateTier,
    #[serde(flatten)]
    pub reference: ReferenceBuilding,
}

impl CreateTemplateRequest {
    /// Title shown for the template, e.g. "Bungalow - Standard"
    pub fn display_title(&self) -> String {
        tiered_title(&self.title, self.tier)
    }
}

fn tiered_title(base: &str, tier: TemplateTier) -> String {
    format!("{} - {}", base.trim(), tier.label())
}

impl Template {
    /// Title without the tier suffix
    pub fn base_title(&self) -> &str {
        let suffix = format!(" - {}", self.tier.label());
        self.title.strip_suffix(suffix.as_str()).unwrap_or(&self.title)
    }

    /// Change the base title and/or tier, keeping the "Title - Tier" form
    pub fn retitle(&mut self, title: Option<&str>, tier: Option<TemplateTier>) {
        let base = title.unwrap_or_else(|| self.base_title()).trim().to_string();
        if let Some(tier) = tier {
            self.tier = tier;
        }
        self.title = tiered_title(&base, self.tier);
    }
}

/// Request DTO for updating a template
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tier: Option<TemplateTier>,
    #[serde(default)]
    pub reference: Option<ReferenceBuilding>,
}

/// Request DTO for adding a material to a template category
#[derive(Debug, Clone, Deserialize)]
pub struct AddMaterialRequest {
    #[serde(default)]
    pub material_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub scaling: Option<MaterialScaling>,
}
