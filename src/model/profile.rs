use serde::Serialize;

/// Cross-section shape of an extruded solid, in model length units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProfileShape {
    Rectangle { x_dim: f64, y_dim: f64 },
    Circle { radius: f64 },
    /// Any other profile definition, kept by entity type for listings.
    Other { entity_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: Option<String>,
    pub shape: ProfileShape,
}

impl Profile {
    #[must_use]
    pub fn rectangle(x_dim: f64, y_dim: f64) -> Self {
        Self {
            name: None,
            shape: ProfileShape::Rectangle { x_dim, y_dim },
        }
    }

    #[must_use]
    pub fn circle(radius: f64) -> Self {
        Self {
            name: None,
            shape: ProfileShape::Circle { radius },
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cross-section area, `None` for shapes without a closed formula.
    #[must_use]
    pub fn area(&self) -> Option<f64> {
        match &self.shape {
            ProfileShape::Rectangle { x_dim, y_dim } => Some(x_dim * y_dim),
            ProfileShape::Circle { radius } => Some(std::f64::consts::PI * radius * radius),
            ProfileShape::Other { .. } => None,
        }
    }
}

/// Where an extrusion was found in the element's representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometrySource {
    Direct,
    /// Reached through one `IfcMappedItem` (type-level shared geometry).
    Mapped,
}

/// A profile swept along a straight depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extrusion {
    pub depth: f64,
    pub profile: Profile,
    pub source: GeometrySource,
}

impl Extrusion {
    #[must_use]
    pub fn new(depth: f64, profile: Profile) -> Self {
        Self {
            depth,
            profile,
            source: GeometrySource::Direct,
        }
    }

    /// Prism volume in cubed model length units.
    #[must_use]
    pub fn volume(&self) -> Option<f64> {
        self.profile.area().map(|area| area * self.depth)
    }
}
