//! Quantity resolution for a single element.
//!
//! Quantity-set values win over geometry. When no matching quantity exists
//! the resolver derives length and volume from the element's extrusion.
//! An unavailable quantity is a distinct outcome, never a silent zero.

use crate::model::{Element, ProfileShape};
use crate::units::{conversion_factor, CanonicalUnit, ProjectScales};
use serde::Serialize;
use thiserror::Error;

/// Why no quantity could be produced for an element.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Unavailable {
    /// The unit family (mass, time) is never present in the model data.
    #[error("quantities in '{unit}' cannot be derived from the model")]
    NotDerivable { unit: CanonicalUnit },

    #[error("unit '{label}' is not recognized")]
    UnrecognizedUnit { label: String },

    /// No quantity set value and no geometry that yields this family.
    #[error("no {unit} quantity in the quantity set and none derivable from geometry")]
    MissingQuantity { unit: CanonicalUnit },

    #[error("profile '{entity_type}' has no area formula")]
    UnsupportedProfile { entity_type: String },

    #[error("element has neither a quantity set nor extrusion geometry")]
    NoData,
}

/// Resolves element quantities at the project's declared scales.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityResolver {
    scales: ProjectScales,
}

impl QuantityResolver {
    #[must_use]
    pub fn new(scales: ProjectScales) -> Self {
        Self { scales }
    }

    /// Magnitude of `element` in `unit` (m, m2, m3 or pieces).
    pub fn resolve(&self, element: &Element, unit: &CanonicalUnit) -> Result<f64, Unavailable> {
        resolve(element, unit, &self.scales)
    }
}

/// See [`QuantityResolver::resolve`].
pub fn resolve(
    element: &Element,
    unit: &CanonicalUnit,
    scales: &ProjectScales,
) -> Result<f64, Unavailable> {
    if unit.is_mass() || *unit == CanonicalUnit::TimeHour {
        return Err(Unavailable::NotDerivable { unit: unit.clone() });
    }
    match unit {
        CanonicalUnit::Count => return Ok(1.0),
        CanonicalUnit::Unrecognized(label) => {
            return Err(Unavailable::UnrecognizedUnit {
                label: label.clone(),
            });
        }
        _ => {}
    }

    if let Some(value) = from_quantity_set(element, unit) {
        let factor = conversion_factor(scales.for_unit(unit), unit);
        return Ok(value * factor);
    }

    from_geometry(element, unit, scales)
}

fn from_quantity_set(element: &Element, unit: &CanonicalUnit) -> Option<f64> {
    let quantities = element.quantities.as_ref()?;
    match unit {
        CanonicalUnit::Area => quantities.area,
        CanonicalUnit::Volume => quantities.volume,
        CanonicalUnit::Length => quantities.length,
        CanonicalUnit::Height => quantities.height,
        _ => None,
    }
}

// Extrusion dimensions are in length units; volumes are cubed length units.
fn from_geometry(
    element: &Element,
    unit: &CanonicalUnit,
    scales: &ProjectScales,
) -> Result<f64, Unavailable> {
    let Some(extrusion) = &element.extrusion else {
        if element.quantities.is_none() {
            return Err(Unavailable::NoData);
        }
        return Err(Unavailable::MissingQuantity { unit: unit.clone() });
    };

    let factor = conversion_factor(scales.length, unit);
    match unit {
        CanonicalUnit::Volume => match &extrusion.profile.shape {
            ProfileShape::Other { entity_type } => Err(Unavailable::UnsupportedProfile {
                entity_type: entity_type.clone(),
            }),
            ProfileShape::Rectangle { .. } | ProfileShape::Circle { .. } => extrusion
                .volume()
                .map(|volume| volume * factor)
                .ok_or(Unavailable::MissingQuantity { unit: unit.clone() }),
        },
        CanonicalUnit::Length | CanonicalUnit::Height => Ok(extrusion.depth * factor),
        _ => Err(Unavailable::MissingQuantity { unit: unit.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseQuantities, ElementClass, Extrusion, Profile, ProfileShape};
    use crate::units::Scale;
    use approx::assert_relative_eq;

    fn beam() -> Element {
        Element::new(10, "2O2Fr$t4X7Zf8NOew3FLOH", ElementClass::Beam)
    }

    fn with_volume(value: f64) -> Element {
        beam().with_quantities(BaseQuantities {
            volume: Some(value),
            ..BaseQuantities::default()
        })
    }

    #[test]
    fn test_count_is_always_one() {
        let resolver = QuantityResolver::default();
        assert_eq!(resolver.resolve(&beam(), &CanonicalUnit::Count), Ok(1.0));
    }

    #[test]
    fn test_mass_and_time_are_not_derivable() {
        let element = with_volume(2.0);
        for unit in [
            CanonicalUnit::MassKg,
            CanonicalUnit::MassG,
            CanonicalUnit::MassTonne,
            CanonicalUnit::TimeHour,
        ] {
            assert_eq!(
                resolve(&element, &unit, &ProjectScales::default()),
                Err(Unavailable::NotDerivable { unit: unit.clone() })
            );
        }
    }

    #[test]
    fn test_unrecognized_unit_is_unavailable() {
        let result = resolve(
            &with_volume(2.0),
            &CanonicalUnit::Unrecognized("furlong".into()),
            &ProjectScales::default(),
        );
        assert!(matches!(result, Err(Unavailable::UnrecognizedUnit { .. })));
    }

    #[test]
    fn test_quantity_set_volume_scaled() {
        let element = with_volume(2.5e9);
        let milli = resolve(&element, &CanonicalUnit::Volume, &ProjectScales::uniform(Scale::Milli));
        let centi = resolve(&element, &CanonicalUnit::Volume, &ProjectScales::uniform(Scale::Centi));
        let base = resolve(&element, &CanonicalUnit::Volume, &ProjectScales::uniform(Scale::Base));
        assert_relative_eq!(milli.unwrap(), 2.5e9 * 1e-9, epsilon = 1e-9);
        assert_relative_eq!(centi.unwrap(), 2.5e9 * 1e-6, epsilon = 1e-9);
        assert_relative_eq!(base.unwrap(), 2.5e9, epsilon = 1e-9);
    }

    #[test]
    fn test_height_reads_named_quantity() {
        let element = beam().with_quantities(BaseQuantities {
            length: Some(6000.0),
            height: Some(3000.0),
            ..BaseQuantities::default()
        });
        let scales = ProjectScales::uniform(Scale::Milli);
        assert_relative_eq!(
            resolve(&element, &CanonicalUnit::Height, &scales).unwrap(),
            3.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            resolve(&element, &CanonicalUnit::Length, &scales).unwrap(),
            6.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_quantity_set_preferred_over_geometry() {
        let element = with_volume(1.5).with_extrusion(Extrusion::new(10.0, Profile::rectangle(1.0, 1.0)));
        assert_eq!(
            resolve(&element, &CanonicalUnit::Volume, &ProjectScales::default()),
            Ok(1.5)
        );
    }

    #[test]
    fn test_rectangle_extrusion_fallback() {
        let element = beam().with_extrusion(Extrusion::new(4000.0, Profile::rectangle(200.0, 300.0)));

        let base = ProjectScales::default();
        assert_relative_eq!(
            resolve(&element, &CanonicalUnit::Volume, &base).unwrap(),
            200.0 * 300.0 * 4000.0
        );
        assert_relative_eq!(resolve(&element, &CanonicalUnit::Length, &base).unwrap(), 4000.0);

        let milli = ProjectScales::uniform(Scale::Milli);
        assert_relative_eq!(
            resolve(&element, &CanonicalUnit::Volume, &milli).unwrap(),
            0.24,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            resolve(&element, &CanonicalUnit::Length, &milli).unwrap(),
            4.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_circle_extrusion_fallback() {
        let element = beam().with_extrusion(Extrusion::new(3.0, Profile::circle(0.2)));
        let volume = resolve(&element, &CanonicalUnit::Volume, &ProjectScales::default()).unwrap();
        assert_relative_eq!(volume, std::f64::consts::PI * 0.04 * 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_area_never_from_geometry() {
        let element = beam().with_extrusion(Extrusion::new(3.0, Profile::rectangle(0.2, 0.3)));
        assert_eq!(
            resolve(&element, &CanonicalUnit::Area, &ProjectScales::default()),
            Err(Unavailable::MissingQuantity {
                unit: CanonicalUnit::Area
            })
        );
    }

    #[test]
    fn test_other_profile_volume_unavailable() {
        let profile = Profile {
            name: None,
            shape: ProfileShape::Other {
                entity_type: "IFCISHAPEPROFILEDEF".into(),
            },
        };
        let element = beam().with_extrusion(Extrusion::new(3.0, profile));
        assert!(matches!(
            resolve(&element, &CanonicalUnit::Volume, &ProjectScales::default()),
            Err(Unavailable::UnsupportedProfile { .. })
        ));
        assert_eq!(
            resolve(&element, &CanonicalUnit::Length, &ProjectScales::default()),
            Ok(3.0)
        );
    }

    #[test]
    fn test_no_data_is_unavailable_not_zero() {
        assert_eq!(
            resolve(&beam(), &CanonicalUnit::Volume, &ProjectScales::default()),
            Err(Unavailable::NoData)
        );
    }
}
