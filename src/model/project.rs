use super::{CostLedger, Element, ElementClass};
use crate::parser::StepFile;
use crate::units::{ProjectScales, ProjectUnits};
use serde::Serialize;

/// A parsed IFC model: structural elements, declared units and cost data.
///
/// The source STEP file is kept so the model can be written back with its
/// cost annotations.
#[derive(Debug, Serialize)]
pub struct IfcModel {
    pub name: String,
    pub schema: String,
    pub file_path: String,
    /// Ordered by STEP id.
    pub elements: Vec<Element>,
    pub units: ProjectUnits,
    pub costs: CostLedger,
    #[serde(skip)]
    pub(crate) step: StepFile,
}

impl IfcModel {
    #[must_use]
    pub fn new(name: String, schema: String, file_path: String, step: StepFile) -> Self {
        Self {
            name,
            schema,
            file_path,
            elements: Vec::new(),
            units: ProjectUnits::default(),
            costs: CostLedger::new(),
            step,
        }
    }

    /// Elements of one class, in model order.
    pub fn elements_by_class(&self, class: ElementClass) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(move |e| e.class == class)
    }

    #[must_use]
    pub fn element(&self, id: u64) -> Option<&Element> {
        self.elements
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|index| &self.elements[index])
    }

    #[must_use]
    pub fn scales(&self) -> ProjectScales {
        ProjectScales::from_units(&self.units)
    }

    #[must_use]
    pub fn step(&self) -> &StepFile {
        &self.step
    }

    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.elements.len()
    }
}
