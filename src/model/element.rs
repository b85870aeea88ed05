use super::Extrusion;
use serde::Serialize;
use std::fmt;

/// Structural element classes the estimator works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ElementClass {
    Beam,
    Column,
    Member,
    Slab,
    Wall,
    Footing,
    Pile,
    Plate,
}

// STEP entity name -> class. IFCWALLSTANDARDCASE folds into Wall.
const ENTITY_CLASSES: &[(&str, ElementClass)] = &[
    ("IFCBEAM", ElementClass::Beam),
    ("IFCBEAMSTANDARDCASE", ElementClass::Beam),
    ("IFCCOLUMN", ElementClass::Column),
    ("IFCCOLUMNSTANDARDCASE", ElementClass::Column),
    ("IFCMEMBER", ElementClass::Member),
    ("IFCMEMBERSTANDARDCASE", ElementClass::Member),
    ("IFCSLAB", ElementClass::Slab),
    ("IFCSLABSTANDARDCASE", ElementClass::Slab),
    ("IFCWALL", ElementClass::Wall),
    ("IFCWALLSTANDARDCASE", ElementClass::Wall),
    ("IFCFOOTING", ElementClass::Footing),
    ("IFCPILE", ElementClass::Pile),
    ("IFCPLATE", ElementClass::Plate),
    ("IFCPLATESTANDARDCASE", ElementClass::Plate),
];

impl ElementClass {
    pub const ALL: [ElementClass; 8] = [
        Self::Beam,
        Self::Column,
        Self::Member,
        Self::Slab,
        Self::Wall,
        Self::Footing,
        Self::Pile,
        Self::Plate,
    ];

    /// Class for a STEP entity type name (`IFCBEAM`), if it is structural.
    #[must_use]
    pub fn from_entity_type(entity_type: &str) -> Option<Self> {
        ENTITY_CLASSES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(entity_type))
            .map(|(_, class)| *class)
    }

    /// Class for a schema-cased name as written in price lists (`IfcBeam`).
    #[must_use]
    pub fn from_ifc_name(name: &str) -> Option<Self> {
        Self::from_entity_type(name.trim())
    }

    #[must_use]
    pub fn ifc_name(self) -> &'static str {
        match self {
            Self::Beam => "IfcBeam",
            Self::Column => "IfcColumn",
            Self::Member => "IfcMember",
            Self::Slab => "IfcSlab",
            Self::Wall => "IfcWall",
            Self::Footing => "IfcFooting",
            Self::Pile => "IfcPile",
            Self::Plate => "IfcPlate",
        }
    }

    /// Name of the matching type object class, used in QTO listings.
    #[must_use]
    pub fn type_class_name(self) -> &'static str {
        match self {
            Self::Beam => "IfcBeamType",
            Self::Column => "IfcColumnType",
            Self::Member => "IfcMemberType",
            Self::Slab => "IfcSlabType",
            Self::Wall => "IfcWallType",
            Self::Footing => "IfcFootingType",
            Self::Pile => "IfcPileType",
            Self::Plate => "IfcPlateType",
        }
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ifc_name())
    }
}

/// Values read from the element's `IfcElementQuantity` sets, in project units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BaseQuantities {
    pub area: Option<f64>,
    pub volume: Option<f64>,
    pub length: Option<f64>,
    pub height: Option<f64>,
}

/// A structural element as extracted from the model. Read-only for the
/// estimator; every optional attribute is resolved once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub id: u64,
    pub global_id: String,
    pub class: ElementClass,
    pub name: Option<String>,
    pub type_name: Option<String>,
    /// `None` when the element carries no quantity set at all.
    pub quantities: Option<BaseQuantities>,
    pub extrusion: Option<Extrusion>,
    pub level: Option<String>,
}

impl Element {
    #[must_use]
    pub fn new(id: u64, global_id: impl Into<String>, class: ElementClass) -> Self {
        Self {
            id,
            global_id: global_id.into(),
            class,
            name: None,
            type_name: None,
            quantities: None,
            extrusion: None,
            level: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_quantities(mut self, quantities: BaseQuantities) -> Self {
        self.quantities = Some(quantities);
        self
    }

    #[must_use]
    pub fn with_extrusion(mut self, extrusion: Extrusion) -> Self {
        self.extrusion = Some(extrusion);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Text used for catalogue matching.
    #[must_use]
    pub fn descriptive_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_lookup() {
        assert_eq!(ElementClass::from_entity_type("IFCBEAM"), Some(ElementClass::Beam));
        assert_eq!(
            ElementClass::from_entity_type("IFCWALLSTANDARDCASE"),
            Some(ElementClass::Wall)
        );
        assert_eq!(ElementClass::from_ifc_name(" IfcSlab "), Some(ElementClass::Slab));
        assert_eq!(ElementClass::from_entity_type("IFCDOOR"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for class in ElementClass::ALL {
            assert_eq!(ElementClass::from_ifc_name(class.ifc_name()), Some(class));
        }
    }
}
