use crate::error::ExportError;
use crate::model::{CostLedger, EntryId, IfcModel, ScheduleId};
use crate::parser::{StepFile, StepValue};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const GUID_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// A fresh 22-character IFC GlobalId (compressed random UUID).
#[must_use]
pub fn new_global_id() -> String {
    compress_guid(uuid::Uuid::new_v4().as_u128())
}

// 2 bits in the first character, 6 bits in each of the other 21.
fn compress_guid(value: u128) -> String {
    (0..22)
        .map(|i| {
            let digit = (value >> (6 * (21 - i))) & 63;
            char::from(GUID_ALPHABET[digit as usize])
        })
        .collect()
}

/// `<output_dir>/<stem>_cost.<ext>` for an input model path.
#[must_use]
pub fn cost_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "model".into(), |s| s.to_string_lossy());
    let extension = input
        .extension()
        .map_or_else(|| "ifc".into(), |s| s.to_string_lossy());
    output_dir.join(format!("{stem}_cost.{extension}"))
}

fn text_or_null(value: &str) -> StepValue {
    if value.is_empty() {
        StepValue::Null
    } else {
        StepValue::String(value.to_string())
    }
}

fn rel_assigns_to_control(step: &mut StepFile, related: Vec<u64>, control: u64) -> u64 {
    step.push_entity(
        "IFCRELASSIGNSTOCONTROL",
        vec![
            StepValue::String(new_global_id()),
            StepValue::Null,
            StepValue::Null,
            StepValue::Null,
            StepValue::List(related.into_iter().map(StepValue::Reference).collect()),
            StepValue::Null,
            StepValue::Reference(control),
        ],
    )
}

fn cost_value(step: &mut StepFile, unit_label: &str, unit_price: f64) -> u64 {
    let mut values = vec![
        StepValue::String("UNIT".to_string()),
        text_or_null(unit_label),
        StepValue::Typed(
            "IFCMONETARYMEASURE".to_string(),
            Box::new(StepValue::Real(unit_price)),
        ),
    ];
    values.resize(10, StepValue::Null);
    step.push_entity("IFCCOSTVALUE", values)
}

/// Appends every ledger record not yet in the STEP file and marks it as
/// persisted. Calling it again appends nothing.
fn sync_ledger(costs: &mut CostLedger, step: &mut StepFile) -> usize {
    let before = step.entities.len();

    for index in 0..costs.schedules().len() {
        let schedule = costs.schedule_mut(ScheduleId(index));
        if schedule.step_id.is_none() {
            let mut values = vec![
                StepValue::String(new_global_id()),
                StepValue::Null,
                StepValue::String(schedule.name.clone()),
                StepValue::Null,
                StepValue::Null,
                StepValue::Null,
                StepValue::Enum("COSTPLAN".to_string()),
            ];
            values.resize(10, StepValue::Null);
            schedule.step_id = Some(step.push_entity("IFCCOSTSCHEDULE", values));
        }
    }

    let mut new_items: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for index in 0..costs.entries().len() {
        let schedule_step_id = costs.schedule(costs.entry(EntryId(index)).schedule).step_id;
        let entry = costs.entry_mut(EntryId(index));

        if entry.price_step_id.is_none() {
            if let Some(price) = entry.unit_price {
                entry.price_step_id = Some(cost_value(step, &entry.unit_label, price));
            }
        }

        match entry.step_id {
            Some(item_id) => {
                // Price attached to an item read from the file.
                let (Some(value_id), Some(item)) = (entry.price_step_id, step.get_entity_mut(item_id))
                else {
                    continue;
                };
                let value_ref = StepValue::Reference(value_id);
                if matches!(item.get(7), Some(StepValue::List(list)) if list.contains(&value_ref)) {
                    continue;
                }
                // values_mut() discards the source text.
                let values = item.values_mut();
                if values.len() < 9 {
                    values.resize(9, StepValue::Null);
                }
                match &mut values[7] {
                    StepValue::List(list) => list.push(value_ref),
                    other => *other = StepValue::List(vec![value_ref]),
                }
            }
            None => {
                let cost_values = entry
                    .price_step_id
                    .map(|id| StepValue::List(vec![StepValue::Reference(id)]))
                    .unwrap_or(StepValue::Null);
                let item_id = step.push_entity(
                    "IFCCOSTITEM",
                    vec![
                        StepValue::String(new_global_id()),
                        StepValue::Null,
                        text_or_null(&entry.name),
                        StepValue::Null,
                        StepValue::Null,
                        StepValue::String(entry.code.clone()),
                        StepValue::Null,
                        cost_values,
                        StepValue::Null,
                    ],
                );
                entry.step_id = Some(item_id);
                if let Some(schedule_id) = schedule_step_id {
                    new_items.entry(schedule_id).or_default().push(item_id);
                }
            }
        }
    }
    for (schedule_id, items) in new_items {
        rel_assigns_to_control(step, items, schedule_id);
    }

    let mut new_links: BTreeMap<EntryId, Vec<u64>> = BTreeMap::new();
    for association in costs.associations().iter().filter(|a| !a.persisted) {
        new_links
            .entry(association.entry)
            .or_default()
            .push(association.element_id);
    }
    for (entry, elements) in new_links {
        if let Some(item_id) = costs.entry(entry).step_id {
            rel_assigns_to_control(step, elements, item_id);
        }
    }
    for association in costs.associations_mut() {
        association.persisted = true;
    }

    step.entities.len() - before
}

/// Writes pending cost data into the model's STEP file and returns the
/// serialized file. Entities from the source keep their original text.
pub fn annotated_step(model: &mut IfcModel) -> String {
    if !model.schema.to_uppercase().starts_with("IFC4") {
        tracing::warn!(schema = %model.schema, "Writing cost data with the IFC4 layout");
    }
    let IfcModel { costs, step, .. } = model;
    let appended = sync_ledger(costs, step);
    tracing::info!(appended, "Cost entities added to model");
    step.to_step_string()
}

/// Writes the annotated model to `path`.
pub fn export_ifc<P: AsRef<Path>>(model: &mut IfcModel, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let content = annotated_step(model);

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    Ok(())
}
