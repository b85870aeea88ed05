use crate::error::ParseError;
use crate::model::{
    BaseQuantities, CostEntry, CostSchedule, Element, ElementClass, EntryId, Extrusion,
    GeometrySource, IfcModel, Profile, ProfileShape, ScheduleId,
};
use crate::parser::step::{StepEntity, StepFile};
use crate::units::{normalize, ProjectUnits};
use std::collections::HashMap;
use std::path::Path;

// Aggregation chains deeper than this are treated as broken.
const MAX_SPATIAL_HOPS: usize = 32;

/// Parses an IFC file into an [`IfcModel`].
///
/// Extracts:
/// - Project metadata (name, schema version) and declared length, area and
///   volume units
/// - Structural elements (beams, columns, members, slabs, walls, footings,
///   piles, plates) with name, type name, base quantities, extrusion
///   geometry and building storey
/// - Cost schedules, cost items and element assignments already present in
///   the file, so an annotated model can be processed again
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_estimator::parser::parse_ifc_file;
///
/// let model = parse_ifc_file("model.ifc")?;
/// for element in &model.elements {
///     println!("{} {}", element.class, element.descriptive_name());
/// }
/// # Ok::<(), ifc_estimator::error::ParseError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<IfcModel, ParseError> {
    let bytes = std::fs::read(&path).map_err(|source| ParseError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    // STEP is ASCII; anything else only appears inside strings.
    let content = String::from_utf8_lossy(&bytes);
    parse_ifc_str(&content, &path.as_ref().to_string_lossy())
}

/// Parses IFC content already in memory. `file_path` is recorded on the
/// model for reporting only.
pub fn parse_ifc_str(content: &str, file_path: &str) -> Result<IfcModel, ParseError> {
    let step_file = StepFile::parse(content)?;

    let project_name = extract_project_name(&step_file);
    let units = extract_project_units(&step_file);
    let elements = extract_elements(&step_file);

    let mut model = IfcModel::new(
        project_name,
        step_file.schema.clone(),
        file_path.to_string(),
        StepFile::default(),
    );
    model.units = units;
    model.elements = elements;
    read_cost_data(&step_file, &mut model);
    model.step = step_file;

    tracing::info!(
        project = %model.name,
        schema = %model.schema,
        elements = model.total_elements(),
        cost_entries = model.costs.entries().len(),
        associations = model.costs.associations().len(),
        "Parsed IFC model"
    );
    Ok(model)
}

fn extract_project_name(step_file: &StepFile) -> String {
    step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|e| e.get_str(2))
        .map_or_else(|| "Unknown Project".to_string(), str::to_string)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn extract_project_units(step_file: &StepFile) -> ProjectUnits {
    let mut units = ProjectUnits::default();

    // IfcProject index 8 = UnitsInContext, IfcUnitAssignment index 0 = Units
    let unit_ids = step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|project| project.get_reference(8))
        .and_then(|id| step_file.get_entity(id))
        .map(|assignment| assignment.get_references(0))
        .unwrap_or_default();

    for unit in unit_ids.into_iter().filter_map(|id| step_file.get_entity(id)) {
        let label = match unit.entity_type.as_str() {
            // IfcSIUnit(Dimensions, UnitType, Prefix, Name)
            "IFCSIUNIT" => {
                let prefix = unit.get(2).and_then(|v| v.as_enum()).unwrap_or_default();
                let name = unit.get(3).and_then(|v| v.as_enum()).unwrap_or_default();
                format!("{prefix}{name}").to_lowercase()
            }
            // IfcConversionBasedUnit(Dimensions, UnitType, Name, ConversionFactor)
            "IFCCONVERSIONBASEDUNIT" => unit.get_str(2).unwrap_or_default().to_lowercase(),
            _ => continue,
        };
        match unit.get(1).and_then(|v| v.as_enum()) {
            Some("LENGTHUNIT") => units.length = Some(label),
            Some("AREAUNIT") => units.area = Some(label),
            Some("VOLUMEUNIT") => units.volume = Some(label),
            _ => {}
        }
    }

    tracing::debug!(?units, "Project units");
    units
}

fn extract_elements(step_file: &StepFile) -> Vec<Element> {
    let type_names = extract_type_names(step_file);
    let quantities = extract_base_quantities(step_file);
    let containment = extract_spatial_containment(step_file);
    let parents = extract_aggregation_parents(step_file);

    let mut elements = Vec::new();
    for entity in step_file.entities.values() {
        let Some(class) = ElementClass::from_entity_type(&entity.entity_type) else {
            continue;
        };

        let mut element = Element::new(entity.id, entity.get_str(0).unwrap_or_default(), class);
        element.name = non_empty(entity.get_str(2));
        element.type_name = type_names.get(&entity.id).cloned();
        element.quantities = quantities.get(&entity.id).copied();
        element.extrusion = extract_extrusion(step_file, entity);
        element.level = find_level(step_file, entity.id, &containment, &parents);

        if element.quantities.is_none() && element.extrusion.is_none() {
            tracing::warn!(
                id = entity.id,
                class = %class,
                "Element has neither quantity set nor extrusion"
            );
        }
        elements.push(element);
    }

    elements
}

fn extract_spatial_containment(step_file: &StepFile) -> HashMap<u64, u64> {
    let mut element_to_structure: HashMap<u64, u64> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
        // Index 4 = RelatedElements (list of element refs)
        // Index 5 = RelatingStructure (spatial element ref)
        if let Some(structure) = rel.get_reference(5) {
            for element_id in rel.get_references(4) {
                element_to_structure.insert(element_id, structure);
            }
        }
    }

    element_to_structure
}

fn extract_aggregation_parents(step_file: &StepFile) -> HashMap<u64, u64> {
    let mut child_to_parent: HashMap<u64, u64> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELAGGREGATES") {
        // Index 4 = RelatingObject, Index 5 = RelatedObjects
        if let Some(parent) = rel.get_reference(4) {
            for child in rel.get_references(5) {
                child_to_parent.entry(child).or_insert(parent);
            }
        }
    }

    child_to_parent
}

/// Name (or GlobalId) of the storey containing the element. Parts without
/// their own containment use their aggregate's container.
fn find_level(
    step_file: &StepFile,
    element_id: u64,
    containment: &HashMap<u64, u64>,
    parents: &HashMap<u64, u64>,
) -> Option<String> {
    let container = containment.get(&element_id).copied().or_else(|| {
        parents
            .get(&element_id)
            .and_then(|parent| containment.get(parent))
            .copied()
    })?;

    let mut current = Some(container);
    for _ in 0..MAX_SPATIAL_HOPS {
        let entity = step_file.get_entity(current?)?;
        if entity.entity_type == "IFCBUILDINGSTOREY" {
            return non_empty(entity.get_str(2)).or_else(|| non_empty(entity.get_str(0)));
        }
        current = parents.get(&entity.id).copied();
    }

    None
}

fn extract_type_names(step_file: &StepFile) -> HashMap<u64, String> {
    let mut element_to_type: HashMap<u64, String> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYTYPE") {
        // Index 4 = RelatedObjects (list of element refs)
        // Index 5 = RelatingType (type ref)
        let Some(type_name) = rel
            .get_reference(5)
            .and_then(|id| step_file.get_entity(id))
            .and_then(|t| non_empty(t.get_str(2)))
        else {
            continue;
        };

        for element_id in rel.get_references(4) {
            element_to_type.insert(element_id, type_name.clone());
        }
    }

    element_to_type
}

#[derive(Default)]
struct QuantityAccumulator {
    area: Option<f64>,
    volume: Option<f64>,
    length: Option<f64>,
    named_length: Option<f64>,
    height: Option<f64>,
}

impl QuantityAccumulator {
    fn add(&mut self, quantity: &StepEntity) {
        // IfcPhysicalSimpleQuantity(Name, Description, Unit, Value, ...)
        let name = quantity.get_str(0).unwrap_or_default();
        let Some(value) = quantity.get_f64(3) else {
            return;
        };

        match quantity.entity_type.as_str() {
            "IFCQUANTITYAREA" => {
                self.area.get_or_insert(value);
            }
            "IFCQUANTITYVOLUME" => {
                self.volume.get_or_insert(value);
            }
            "IFCQUANTITYLENGTH" => match name {
                "Height" => {
                    self.height.get_or_insert(value);
                }
                "Length" => {
                    self.named_length.get_or_insert(value);
                }
                "Width" => {}
                _ => {
                    self.length.get_or_insert(value);
                }
            },
            _ => {}
        }
    }

    fn finish(&self) -> BaseQuantities {
        BaseQuantities {
            area: self.area,
            volume: self.volume,
            length: self.named_length.or(self.length),
            height: self.height,
        }
    }
}

fn extract_base_quantities(step_file: &StepFile) -> HashMap<u64, BaseQuantities> {
    let mut accumulators: HashMap<u64, QuantityAccumulator> = HashMap::new();

    for rel in step_file.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
        // Index 4 = RelatedObjects, Index 5 = RelatingPropertyDefinition
        let Some(qset) = rel
            .get_reference(5)
            .and_then(|id| step_file.get_entity(id))
            .filter(|e| e.entity_type == "IFCELEMENTQUANTITY")
        else {
            continue;
        };

        // IfcElementQuantity index 5 = Quantities
        let quantities: Vec<&StepEntity> = qset
            .get_references(5)
            .into_iter()
            .filter_map(|id| step_file.get_entity(id))
            .collect();

        for element_id in rel.get_references(4) {
            let accumulator = accumulators.entry(element_id).or_default();
            for quantity in &quantities {
                accumulator.add(quantity);
            }
        }
    }

    accumulators
        .into_iter()
        .map(|(id, acc)| (id, acc.finish()))
        .collect()
}

/// First extrusion of the element's representation, `Body` representations
/// first. Mapped geometry is followed exactly one hop.
fn extract_extrusion(step_file: &StepFile, element: &StepEntity) -> Option<Extrusion> {
    // IfcProduct index 6 = Representation, IfcProductDefinitionShape index 2 = Representations
    let shape = step_file.get_entity(element.get_reference(6)?)?;
    let mut representations: Vec<&StepEntity> = shape
        .get_references(2)
        .into_iter()
        .filter_map(|id| step_file.get_entity(id))
        .collect();
    // Stable: keeps file order among equally ranked representations.
    representations.sort_by_key(|rep| !rep.get_str(1).is_some_and(|id| id.eq_ignore_ascii_case("Body")));

    for representation in representations {
        // IfcShapeRepresentation index 3 = Items
        for item in representation
            .get_references(3)
            .into_iter()
            .filter_map(|id| step_file.get_entity(id))
        {
            match item.entity_type.as_str() {
                "IFCEXTRUDEDAREASOLID" => {
                    if let Some(extrusion) = read_extruded_solid(step_file, item) {
                        return Some(extrusion);
                    }
                }
                "IFCMAPPEDITEM" => {
                    if let Some(mut extrusion) = read_mapped_item(step_file, item) {
                        extrusion.source = GeometrySource::Mapped;
                        return Some(extrusion);
                    }
                }
                _ => {}
            }
        }
    }

    None
}

fn read_mapped_item(step_file: &StepFile, item: &StepEntity) -> Option<Extrusion> {
    // IfcMappedItem index 0 = MappingSource, IfcRepresentationMap index 1 = MappedRepresentation
    let map = step_file.get_entity(item.get_reference(0)?)?;
    let representation = step_file.get_entity(map.get_reference(1)?)?;

    representation
        .get_references(3)
        .into_iter()
        .filter_map(|id| step_file.get_entity(id))
        .filter(|e| e.entity_type == "IFCEXTRUDEDAREASOLID")
        .find_map(|solid| read_extruded_solid(step_file, solid))
}

fn read_extruded_solid(step_file: &StepFile, solid: &StepEntity) -> Option<Extrusion> {
    // IfcExtrudedAreaSolid(SweptArea, Position, ExtrudedDirection, Depth)
    let depth = solid.get_f64(3)?;
    let profile = step_file.get_entity(solid.get_reference(0)?)?;
    Some(Extrusion::new(depth, read_profile(profile)))
}

fn read_profile(profile: &StepEntity) -> Profile {
    // IfcProfileDef(ProfileType, ProfileName, ...)
    let shape = match profile.entity_type.as_str() {
        "IFCRECTANGLEPROFILEDEF" => match (profile.get_f64(3), profile.get_f64(4)) {
            (Some(x_dim), Some(y_dim)) => ProfileShape::Rectangle { x_dim, y_dim },
            _ => other_shape(profile),
        },
        "IFCCIRCLEPROFILEDEF" => match profile.get_f64(3) {
            Some(radius) => ProfileShape::Circle { radius },
            None => other_shape(profile),
        },
        _ => other_shape(profile),
    };

    Profile {
        name: non_empty(profile.get_str(1)),
        shape,
    }
}

fn other_shape(profile: &StepEntity) -> ProfileShape {
    ProfileShape::Other {
        entity_type: profile.entity_type.clone(),
    }
}

/// Loads cost schedules, items, unit values and element links into the
/// model's ledger. Everything read here is marked as already persisted.
fn read_cost_data(step_file: &StepFile, model: &mut IfcModel) {
    let schedules = step_file.get_entities_by_type("IFCCOSTSCHEDULE");
    if schedules.is_empty() {
        return;
    }
    if !model.schema.to_uppercase().starts_with("IFC4") {
        tracing::warn!(schema = %model.schema, "Cost data is read with the IFC4 layout");
    }

    let mut schedule_ids: HashMap<u64, ScheduleId> = HashMap::new();
    for schedule in schedules {
        let name = non_empty(schedule.get_str(2)).unwrap_or_else(|| format!("#{}", schedule.id));
        let id = match model.costs.find_schedule(&name) {
            Some(id) => id,
            None => model.costs.push_schedule(CostSchedule {
                name,
                step_id: Some(schedule.id),
            }),
        };
        schedule_ids.insert(schedule.id, id);
    }

    // IfcRelAssignsToControl index 4 = RelatedObjects, index 6 = RelatingControl
    let controls = step_file.get_entities_by_type("IFCRELASSIGNSTOCONTROL");

    let mut item_schedule: HashMap<u64, ScheduleId> = HashMap::new();
    for rel in &controls {
        let Some(schedule) = rel.get_reference(6).and_then(|id| schedule_ids.get(&id)) else {
            continue;
        };
        for object in rel.get_references(4) {
            item_schedule.entry(object).or_insert(*schedule);
        }
    }

    let mut item_entries: HashMap<u64, EntryId> = HashMap::new();
    for item in step_file.get_entities_by_type("IFCCOSTITEM") {
        let Some(&schedule) = item_schedule.get(&item.id) else {
            tracing::debug!(id = item.id, "Cost item outside any schedule");
            continue;
        };
        match read_cost_item(step_file, item, schedule) {
            Some(entry) => {
                let id = match model.costs.entry_by_code(schedule, &entry.code) {
                    Some(existing) => existing,
                    None => model.costs.push_entry(entry),
                };
                item_entries.insert(item.id, id);
            }
            None => tracing::warn!(id = item.id, "Cost item without identification"),
        }
    }

    for rel in &controls {
        let Some(&entry) = rel.get_reference(6).and_then(|id| item_entries.get(&id)) else {
            continue;
        };
        for element_id in rel.get_references(4) {
            if model.element(element_id).is_some() {
                model.costs.link(element_id, entry, true);
            }
        }
    }
}

fn read_cost_item(step_file: &StepFile, item: &StepEntity, schedule: ScheduleId) -> Option<CostEntry> {
    // IfcCostItem(GlobalId, OwnerHistory, Name, Description, ObjectType,
    //             Identification, PredefinedType, CostValues, CostQuantities)
    let name = non_empty(item.get_str(2));
    let code = non_empty(item.get_str(5)).or_else(|| name.clone())?;

    // IfcCostValue(Name, Description, AppliedValue, ...); the unit label is
    // kept in Description.
    let value = item
        .get_references(7)
        .into_iter()
        .filter_map(|id| step_file.get_entity(id))
        .find(|e| e.entity_type == "IFCCOSTVALUE");

    let unit_label = value
        .and_then(|v| non_empty(v.get_str(1)))
        .unwrap_or_default();
    let unit_price = value.and_then(|v| v.get_f64(2));
    if value.is_some() && unit_price.is_none() {
        tracing::warn!(id = item.id, code = %code, "Cost value has no numeric applied value");
    }

    Some(CostEntry {
        schedule,
        name: name.unwrap_or_else(|| code.clone()),
        unit: normalize(&unit_label),
        unit_label,
        unit_price,
        step_id: Some(item.id),
        price_step_id: value.filter(|_| unit_price.is_some()).map(|v| v.id),
        code,
    })
}
