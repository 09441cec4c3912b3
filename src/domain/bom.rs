//! BOM generation
//!
//! Scales a template's reference bill of materials to a target building and
//! rolls up material, labor and marked-up project costs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::locations::Location;
use super::templates::{
    is_discrete_unit, CategoryKind, MaterialScaling, ReferenceBuilding, TemplateBom,
    TemplateError, TemplateMaterial,
};

/// Labor is priced as a fixed share of material cost
pub const LABOR_RATE: f64 = 0.35;

pub const DEFAULT_ROOM_COUNT: u32 = 6;
pub const DEFAULT_FOUNDATION_DEPTH: f64 = 1.5;

#[derive(Debug, Error, PartialEq)]
pub enum BomError {
    #[error("Template {0} not found")]
    TemplateNotFound(Uuid),

    #[error("Location '{0}' not found")]
    LocationNotFound(String),

    #[error("BOM must include categories and materials data")]
    InvalidBom,

    #[error("Invalid building parameter '{0}'")]
    InvalidParameters(&'static str),

    #[error("Template reference dimension '{0}' must be greater than zero")]
    DegenerateTemplate(&'static str),
}

/// Target building parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomParams {
    pub total_area: f64,
    pub num_floors: u32,
    pub avg_floor_height: f64,
    #[serde(default)]
    pub room_count: Option<u32>,
    #[serde(default)]
    pub foundation_depth: Option<f64>,
}

impl BomParams {
    /// Room count, falling back to the default when absent or zero
    pub fn room_count(&self) -> u32 {
        self.room_count
            .filter(|count| *count > 0)
            .unwrap_or(DEFAULT_ROOM_COUNT)
    }

    /// Foundation depth, falling back to the default when absent or zero
    pub fn foundation_depth(&self) -> f64 {
        self.foundation_depth
            .filter(|depth| *depth != 0.0)
            .unwrap_or(DEFAULT_FOUNDATION_DEPTH)
    }

    pub fn validate(&self) -> Result<(), BomError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.total_area) {
            return Err(BomError::InvalidParameters("total_area"));
        }
        if self.num_floors == 0 {
            return Err(BomError::InvalidParameters("num_floors"));
        }
        if !positive(self.avg_floor_height) {
            return Err(BomError::InvalidParameters("avg_floor_height"));
        }
        if !positive(self.foundation_depth()) {
            return Err(BomError::InvalidParameters("foundation_depth"));
        }
        Ok(())
    }
}

/// Ratios of target to reference dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub area: f64,
    pub floor: f64,
    pub height: f64,
    pub room: f64,
    pub foundation: f64,
}

impl ScaleFactors {
    pub fn between(reference: &ReferenceBuilding, params: &BomParams) -> Result<Self, BomError> {
        match reference.validate() {
            Ok(()) => {}
            Err(TemplateError::InvalidReference(field)) => {
                return Err(BomError::DegenerateTemplate(field))
            }
            Err(_) => return Err(BomError::DegenerateTemplate("reference")),
        }

        Ok(Self {
            area: params.total_area / reference.total_area,
            floor: f64::from(params.num_floors) / f64::from(reference.num_floors),
            height: params.avg_floor_height / reference.avg_floor_height,
            room: f64::from(params.room_count()) / f64::from(reference.room_count),
            foundation: params.foundation_depth() / reference.foundation_depth,
        })
    }

    /// Default multiplier for categories without a specific rule
    pub fn composite(&self) -> f64 {
        self.area * self.floor * self.height
    }

    /// Extra multipliers a material opts into on top of its category rule
    pub fn overlay(&self, scaling: &MaterialScaling) -> f64 {
        let room = if scaling.room_count_factor { self.room } else { 1.0 };
        let foundation = if scaling.foundation_depth_factor {
            self.foundation
        } else {
            1.0
        };
        room * foundation
    }
}

impl CategoryKind {
    /// Multiplier applied to every material of this category
    pub fn multiplier(&self, f: &ScaleFactors) -> f64 {
        match self {
            CategoryKind::Earthwork => f.area * f.height,
            CategoryKind::Concrete | CategoryKind::Rebars => f.area * f.floor * f.height,
            CategoryKind::Formworks
            | CategoryKind::Scaffoldings
            | CategoryKind::Masonry
            | CategoryKind::ArchitecturalTiles
            | CategoryKind::ArchitecturalPainting => f.area * f.floor,
            CategoryKind::Roofing => f.area,
            CategoryKind::DoorsAndWindows => f.room,
            CategoryKind::Electrical | CategoryKind::Plumbing => f.area * f.floor * f.room,
            CategoryKind::SepticTankAndCatchBasins => f.foundation,
            CategoryKind::Other => f.composite(),
        }
    }
}

/// Location applied to a generated BOM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedLocation {
    pub name: Option<String>,
    pub markup: f64,
}

/// Echo of the parameters a BOM was generated for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectDetails {
    pub total_area: f64,
    pub num_floors: u32,
    pub avg_floor_height: f64,
    pub room_count: u32,
    pub foundation_depth: f64,
    pub location: AppliedLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedCategory {
    pub category: String,
    pub materials: Vec<TemplateMaterial>,
    pub category_total: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostSummary {
    pub labor_cost: f64,
    pub total_project_cost: f64,
}

impl CostSummary {
    pub fn from_materials(total_materials_cost: f64) -> Self {
        let labor_cost = total_materials_cost * LABOR_RATE;
        Self {
            labor_cost,
            total_project_cost: total_materials_cost + labor_cost,
        }
    }

    pub fn marked_up(&self, fraction: f64) -> Self {
        Self {
            labor_cost: self.labor_cost * (1.0 + fraction),
            total_project_cost: self.total_project_cost * (1.0 + fraction),
        }
    }
}

/// Scaled bill of materials for a target building
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedBom {
    pub project_details: ProjectDetails,
    pub categories: Vec<GeneratedCategory>,
    pub total_materials_cost: f64,
    pub original_costs: CostSummary,
    pub marked_up_costs: CostSummary,
}

impl GeneratedBom {
    /// Every BOM needs at least one category and no empty category
    pub fn validate(&self) -> Result<(), BomError> {
        if self.categories.is_empty() || self.categories.iter().any(|c| c.materials.is_empty()) {
            return Err(BomError::InvalidBom);
        }
        Ok(())
    }
}

fn scale_material(
    material: &TemplateMaterial,
    category_multiplier: f64,
    factors: &ScaleFactors,
) -> TemplateMaterial {
    let mut quantity = material.quantity * category_multiplier * factors.overlay(&material.scaling);
    if is_discrete_unit(&material.unit) {
        quantity = quantity.ceil();
    }

    let mut scaled = material.clone();
    scaled.quantity = quantity;
    scaled.recompute_total();
    scaled
}

/// Scale a template to the target building.
///
/// Template and location lookups happen before this is called; a location
/// only contributes its markup.
pub fn generate(
    template: &TemplateBom,
    params: &BomParams,
    location: Option<&Location>,
) -> Result<GeneratedBom, BomError> {
    params.validate()?;
    let factors = ScaleFactors::between(&template.reference, params)?;

    let categories: Vec<GeneratedCategory> = template
        .categories
        .iter()
        .map(|category| {
            let multiplier = category.kind().multiplier(&factors);
            let materials: Vec<TemplateMaterial> = category
                .materials
                .iter()
                .map(|m| scale_material(m, multiplier, &factors))
                .collect();
            let category_total = materials.iter().map(|m| m.total_amount).sum();

            GeneratedCategory {
                category: category.category.clone(),
                materials,
                category_total,
            }
        })
        .collect();

    let total_materials_cost: f64 = categories.iter().map(|c| c.category_total).sum();
    let original_costs = CostSummary::from_materials(total_materials_cost);

    let (applied, marked_up_costs) = match location {
        Some(loc) => (
            AppliedLocation {
                name: Some(loc.name.clone()),
                markup: loc.markup,
            },
            original_costs.marked_up(loc.markup_fraction()),
        ),
        None => (
            AppliedLocation {
                name: None,
                markup: 0.0,
            },
            original_costs,
        ),
    };

    tracing::debug!(
        area_factor = factors.area,
        floor_factor = factors.floor,
        height_factor = factors.height,
        room_factor = factors.room,
        foundation_factor = factors.foundation,
        total_materials_cost,
        "Scaled template BOM"
    );

    let bom = GeneratedBom {
        project_details: ProjectDetails {
            total_area: params.total_area,
            num_floors: params.num_floors,
            avg_floor_height: params.avg_floor_height,
            room_count: params.room_count(),
            foundation_depth: params.foundation_depth(),
            location: applied,
        },
        categories,
        total_materials_cost,
        original_costs,
        marked_up_costs,
    };

    bom.validate()?;
    Ok(bom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::templates::Category;
    use chrono::Utc;

    const EPS: f64 = 1e-9;

    fn reference() -> ReferenceBuilding {
        ReferenceBuilding {
            total_area: 100.0,
            num_floors: 1,
            avg_floor_height: 3.0,
            room_count: 4,
            foundation_depth: 1.0,
        }
    }

    fn material(quantity: f64, unit: &str, cost: f64) -> TemplateMaterial {
        TemplateMaterial {
            item: "1.1".to_string(),
            material_id: None,
            description: "line".to_string(),
            quantity,
            unit: unit.to_string(),
            cost,
            total_amount: quantity * cost,
            scaling: MaterialScaling::default(),
        }
    }

    fn template(categories: Vec<(&str, Vec<TemplateMaterial>)>) -> TemplateBom {
        TemplateBom {
            reference: reference(),
            categories: categories
                .into_iter()
                .map(|(name, materials)| Category {
                    category: name.to_string(),
                    materials,
                })
                .collect(),
        }
    }

    fn params(total_area: f64, num_floors: u32, avg_floor_height: f64) -> BomParams {
        BomParams {
            total_area,
            num_floors,
            avg_floor_height,
            room_count: Some(4),
            foundation_depth: Some(1.0),
        }
    }

    fn location(markup: f64) -> Location {
        Location {
            id: Uuid::new_v4(),
            name: "Metro".to_string(),
            markup,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn roofing_scales_with_area_only() {
        let tpl = template(vec![("Roofing", vec![material(10.0, "sheets", 100.0)])]);

        let bom = generate(&tpl, &params(200.0, 1, 3.0), None).unwrap();

        let scaled = &bom.categories[0].materials[0];
        assert_eq!(scaled.quantity, 20.0);
        assert_eq!(scaled.total_amount, 2000.0);
        assert_eq!(bom.categories[0].category_total, 2000.0);
    }

    #[test]
    fn reference_parameters_reproduce_the_template() {
        let tpl = template(vec![
            ("Concrete", vec![material(12.5, "kgs", 80.0)]),
            ("Plumbing", vec![material(7.0, "pcs", 35.0)]),
            ("Custom Works", vec![material(3.3, "liters", 10.0)]),
        ]);

        let bom = generate(&tpl, &params(100.0, 1, 3.0), None).unwrap();

        for (generated, original) in bom.categories.iter().zip(&tpl.categories) {
            assert!((generated.materials[0].quantity - original.materials[0].quantity).abs() < EPS);
            assert!(
                (generated.materials[0].total_amount - original.materials[0].total_amount).abs()
                    < EPS
            );
        }
    }

    #[test]
    fn category_rules_pick_their_factors() {
        let f = ScaleFactors {
            area: 2.0,
            floor: 3.0,
            height: 5.0,
            room: 7.0,
            foundation: 11.0,
        };
        assert_eq!(CategoryKind::Earthwork.multiplier(&f), 10.0);
        assert_eq!(CategoryKind::Rebars.multiplier(&f), 30.0);
        assert_eq!(CategoryKind::Masonry.multiplier(&f), 6.0);
        assert_eq!(CategoryKind::Roofing.multiplier(&f), 2.0);
        assert_eq!(CategoryKind::DoorsAndWindows.multiplier(&f), 7.0);
        assert_eq!(CategoryKind::Electrical.multiplier(&f), 42.0);
        assert_eq!(CategoryKind::SepticTankAndCatchBasins.multiplier(&f), 11.0);
        assert_eq!(CategoryKind::Other.multiplier(&f), 30.0);
    }

    #[test]
    fn material_overlays_stack_on_the_category_rule() {
        let mut line = material(1.0, "kgs", 1.0);
        line.scaling.room_count_factor = true;
        line.scaling.foundation_depth_factor = true;
        let tpl = template(vec![("Roofing", vec![line])]);

        let target = BomParams {
            total_area: 200.0,
            num_floors: 1,
            avg_floor_height: 3.0,
            room_count: Some(8),
            foundation_depth: Some(1.5),
        };
        let bom = generate(&tpl, &target, None).unwrap();

        // area 2 x room 2 x foundation 1.5
        assert!((bom.categories[0].materials[0].quantity - 6.0).abs() < EPS);
    }

    #[test]
    fn discrete_units_round_up_and_others_stay_fractional() {
        let tpl = template(vec![(
            "Masonry",
            vec![material(3.0, "bags", 10.0), material(3.0, "kgs", 10.0)],
        )]);

        let bom = generate(&tpl, &params(110.0, 1, 3.0), None).unwrap();

        let materials = &bom.categories[0].materials;
        assert_eq!(materials[0].quantity, 4.0);
        assert!((materials[1].quantity - 3.3).abs() < EPS);
        assert!((materials[1].total_amount - 33.0).abs() < EPS);
    }

    #[test]
    fn costs_roll_up_with_labor_and_markup() {
        let tpl = template(vec![
            ("Roofing", vec![material(10.0, "sheets", 100.0)]),
            ("Earthwork", vec![material(2.0, "kgs", 500.0)]),
        ]);

        let bom = generate(&tpl, &params(100.0, 1, 3.0), Some(&location(10.0))).unwrap();

        assert!((bom.total_materials_cost - 2000.0).abs() < EPS);
        assert!((bom.original_costs.labor_cost - 700.0).abs() < EPS);
        assert!((bom.original_costs.total_project_cost - 2700.0).abs() < EPS);
        assert!((bom.marked_up_costs.labor_cost - 770.0).abs() < EPS);
        assert!((bom.marked_up_costs.total_project_cost - 2970.0).abs() < EPS);
        assert_eq!(bom.project_details.location.markup, 10.0);
        assert_eq!(bom.project_details.location.name.as_deref(), Some("Metro"));
    }

    #[test]
    fn without_location_marked_up_costs_equal_original() {
        let tpl = template(vec![("Roofing", vec![material(10.0, "sheets", 100.0)])]);

        let bom = generate(&tpl, &params(100.0, 1, 3.0), None).unwrap();

        assert_eq!(bom.marked_up_costs, bom.original_costs);
        assert_eq!(bom.project_details.location.markup, 0.0);
        assert!(bom.project_details.location.name.is_none());
    }

    #[test]
    fn missing_room_count_and_depth_use_defaults() {
        let tpl = template(vec![("Doors and Windows", vec![material(4.0, "set", 1.0)])]);
        let target = BomParams {
            total_area: 100.0,
            num_floors: 1,
            avg_floor_height: 3.0,
            room_count: None,
            foundation_depth: None,
        };

        let bom = generate(&tpl, &target, None).unwrap();

        assert_eq!(bom.project_details.room_count, 6);
        assert_eq!(bom.project_details.foundation_depth, 1.5);
        // 4 sets x (6 / 4 rooms)
        assert_eq!(bom.categories[0].materials[0].quantity, 6.0);
    }

    #[test]
    fn empty_category_is_rejected() {
        let tpl = template(vec![
            ("Roofing", vec![material(10.0, "sheets", 100.0)]),
            ("Plumbing", vec![]),
        ]);

        assert_eq!(
            generate(&tpl, &params(100.0, 1, 3.0), None).unwrap_err(),
            BomError::InvalidBom
        );
        assert_eq!(
            generate(&template(vec![]), &params(100.0, 1, 3.0), None).unwrap_err(),
            BomError::InvalidBom
        );
    }

    #[test]
    fn zero_reference_dimension_is_reported() {
        let mut tpl = template(vec![("Roofing", vec![material(10.0, "sheets", 100.0)])]);
        tpl.reference.total_area = 0.0;

        assert_eq!(
            generate(&tpl, &params(100.0, 1, 3.0), None).unwrap_err(),
            BomError::DegenerateTemplate("total_area")
        );
    }

    #[test]
    fn invalid_target_parameters_are_rejected() {
        let tpl = template(vec![("Roofing", vec![material(10.0, "sheets", 100.0)])]);

        assert_eq!(
            generate(&tpl, &params(-5.0, 1, 3.0), None).unwrap_err(),
            BomError::InvalidParameters("total_area")
        );
        assert_eq!(
            generate(&tpl, &params(100.0, 0, 3.0), None).unwrap_err(),
            BomError::InvalidParameters("num_floors")
        );
    }
}
