use super::NO_LEVEL;
use crate::model::Element;
use serde::Serialize;
use std::collections::BTreeMap;

/// Element counts for one type (or one untyped class), split by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    /// `IfcBeamType` for typed elements, `IfcBeam` for untyped ones.
    pub type_class: &'static str,
    /// `None` for elements without a type.
    pub type_name: Option<String>,
    /// Level name and count, sorted by level name.
    pub levels: Vec<(String, usize)>,
    pub total: usize,
}

/// Quantity take-off: element counts without cost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuantityTakeOff {
    /// Typed groups by (type class, type name), then untyped groups by class.
    pub groups: Vec<TypeCount>,
    pub total: usize,
}

impl QuantityTakeOff {
    pub fn typed(&self) -> impl Iterator<Item = &TypeCount> {
        self.groups.iter().filter(|g| g.type_name.is_some())
    }

    pub fn untyped(&self) -> impl Iterator<Item = &TypeCount> {
        self.groups.iter().filter(|g| g.type_name.is_none())
    }
}

/// Counts elements per type and level.
#[must_use]
pub fn quantity_take_off(elements: &[Element]) -> QuantityTakeOff {
    let mut typed: BTreeMap<(&'static str, &str), BTreeMap<&str, usize>> = BTreeMap::new();
    let mut untyped: BTreeMap<&'static str, BTreeMap<&str, usize>> = BTreeMap::new();

    for element in elements {
        let level = element.level.as_deref().unwrap_or(NO_LEVEL);
        let levels = match element.type_name.as_deref() {
            Some(name) => typed
                .entry((element.class.type_class_name(), name))
                .or_default(),
            None => untyped.entry(element.class.ifc_name()).or_default(),
        };
        *levels.entry(level).or_insert(0) += 1;
    }

    let group = |type_class, type_name: Option<&str>, levels: BTreeMap<&str, usize>| TypeCount {
        type_class,
        type_name: type_name.map(str::to_string),
        total: levels.values().sum(),
        levels: levels
            .into_iter()
            .map(|(level, count)| (level.to_string(), count))
            .collect(),
    };

    let groups: Vec<TypeCount> = typed
        .into_iter()
        .map(|((class, name), levels)| group(class, Some(name), levels))
        .chain(
            untyped
                .into_iter()
                .map(|(class, levels)| group(class, None, levels)),
        )
        .collect();

    QuantityTakeOff {
        total: elements.len(),
        groups,
    }
}
