use crate::model::{Element, ElementClass, GeometrySource, ProfileShape};
use serde::Serialize;
use std::collections::BTreeMap;

/// Group name for profiles without a `ProfileName`.
pub const UNNAMED_PROFILE: &str = "Unnamed";

/// One element using a profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUse {
    pub element_id: u64,
    pub global_id: String,
    pub class: ElementClass,
    pub shape: ProfileShape,
    pub source: GeometrySource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileGroup {
    pub name: String,
    pub uses: Vec<ProfileUse>,
}

/// Extrusion profiles grouped by profile name, sorted by name. Elements keep
/// model order inside a group. `class` restricts the listing to one class.
#[must_use]
pub fn profile_schedule(elements: &[Element], class: Option<ElementClass>) -> Vec<ProfileGroup> {
    let mut groups: BTreeMap<&str, Vec<ProfileUse>> = BTreeMap::new();

    for element in elements {
        if class.is_some_and(|c| c != element.class) {
            continue;
        }
        let Some(extrusion) = &element.extrusion else {
            continue;
        };

        let name = extrusion
            .profile
            .name
            .as_deref()
            .unwrap_or(UNNAMED_PROFILE);
        groups.entry(name).or_default().push(ProfileUse {
            element_id: element.id,
            global_id: element.global_id.clone(),
            class: element.class,
            shape: extrusion.profile.shape.clone(),
            source: extrusion.source,
        });
    }

    groups
        .into_iter()
        .map(|(name, uses)| ProfileGroup {
            name: name.to_string(),
            uses,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Extrusion, Profile};

    #[test]
    fn test_groups_by_profile_name() {
        let elements = vec![
            Element::new(1, "c1", ElementClass::Column)
                .with_extrusion(Extrusion::new(3000.0, Profile::rectangle(300.0, 300.0).named("C300"))),
            Element::new(2, "b1", ElementClass::Beam)
                .with_extrusion(Extrusion::new(5000.0, Profile::rectangle(200.0, 400.0))),
            Element::new(3, "c2", ElementClass::Column)
                .with_extrusion(Extrusion::new(3000.0, Profile::rectangle(300.0, 300.0).named("C300"))),
            Element::new(4, "c3", ElementClass::Column),
        ];

        let all = profile_schedule(&elements, None);
        let names: Vec<&str> = all.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["C300", UNNAMED_PROFILE]);
        assert_eq!(all[0].uses.len(), 2);
        assert_eq!(all[0].uses[1].global_id, "c2");

        let columns = profile_schedule(&elements, Some(ElementClass::Column));
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].uses.len(), 2);
    }
}
