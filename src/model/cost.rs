//! Cost data attached to the model: schedules, de-duplicated cost entries and
//! element associations.
//!
//! The ledger is the only place cost records are created. Every creating call
//! checks first, so running the same assignment twice leaves it unchanged.

use crate::units::{normalize, CanonicalUnit};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScheduleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId(pub usize);

/// A named price list inside the model (`IfcCostSchedule`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSchedule {
    pub name: String,
    /// STEP id once the schedule exists in the file.
    pub step_id: Option<u64>,
}

/// One priced catalogue line (`IfcCostItem` plus its unit `IfcCostValue`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEntry {
    pub schedule: ScheduleId,
    pub code: String,
    pub name: String,
    /// Unit label as written in the catalogue.
    pub unit_label: String,
    pub unit: CanonicalUnit,
    pub unit_price: Option<f64>,
    pub step_id: Option<u64>,
    pub price_step_id: Option<u64>,
}

impl CostEntry {
    #[must_use]
    pub fn state(&self) -> EntryState {
        if self.unit_price.is_some() {
            EntryState::PriceAttached
        } else {
            EntryState::EntryCreated
        }
    }

    /// Sets the unit label and its canonical unit together.
    pub fn set_unit(&mut self, label: &str) {
        self.unit_label = label.trim().to_string();
        self.unit = normalize(label);
    }
}

/// Link between an element and a cost entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Association {
    pub element_id: u64,
    pub entry: EntryId,
    /// Already written to (or read from) the STEP file.
    pub persisted: bool,
}

/// Per-code lifecycle. Progression is forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EntryState {
    Unseen,
    EntryCreated,
    PriceAttached,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CostLedger {
    schedules: Vec<CostSchedule>,
    entries: Vec<CostEntry>,
    associations: Vec<Association>,
    #[serde(skip)]
    by_code: HashMap<(ScheduleId, String), EntryId>,
    #[serde(skip)]
    linked: HashSet<(u64, EntryId)>,
}

impl CostLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schedule with this name, creating it when missing.
    pub fn ensure_schedule(&mut self, name: &str) -> ScheduleId {
        if let Some(id) = self.find_schedule(name) {
            return id;
        }
        self.push_schedule(CostSchedule {
            name: name.to_string(),
            step_id: None,
        })
    }

    #[must_use]
    pub fn find_schedule(&self, name: &str) -> Option<ScheduleId> {
        self.schedules
            .iter()
            .position(|s| s.name == name)
            .map(ScheduleId)
    }

    pub(crate) fn push_schedule(&mut self, schedule: CostSchedule) -> ScheduleId {
        self.schedules.push(schedule);
        ScheduleId(self.schedules.len() - 1)
    }

    /// Returns the entry for `code` in `schedule`, creating it when missing.
    /// A second call with the same code returns the first entry unchanged.
    pub fn ensure_entry(
        &mut self,
        schedule: ScheduleId,
        code: &str,
        name: &str,
        unit_label: &str,
    ) -> EntryId {
        if let Some(id) = self.entry_by_code(schedule, code) {
            let entry = &mut self.entries[id.0];
            if entry.unit_label.is_empty() && !unit_label.trim().is_empty() {
                entry.set_unit(unit_label);
            }
            return id;
        }

        tracing::debug!(code = %code, name = %name, "Creating cost entry");
        self.push_entry(CostEntry {
            schedule,
            code: code.to_string(),
            name: if name.is_empty() { code } else { name }.to_string(),
            unit_label: unit_label.trim().to_string(),
            unit: normalize(unit_label),
            unit_price: None,
            step_id: None,
            price_step_id: None,
        })
    }

    pub(crate) fn push_entry(&mut self, entry: CostEntry) -> EntryId {
        let id = EntryId(self.entries.len());
        self.by_code
            .entry((entry.schedule, entry.code.clone()))
            .or_insert(id);
        self.entries.push(entry);
        id
    }

    #[must_use]
    pub fn entry_by_code(&self, schedule: ScheduleId, code: &str) -> Option<EntryId> {
        self.by_code.get(&(schedule, code.to_string())).copied()
    }

    #[must_use]
    pub fn entry_state(&self, schedule: ScheduleId, code: &str) -> EntryState {
        self.entry_by_code(schedule, code)
            .map_or(EntryState::Unseen, |id| self.entries[id.0].state())
    }

    /// Attaches a unit price unless one is already present.
    /// Returns `true` when the price was attached by this call.
    pub fn attach_price(&mut self, entry: EntryId, unit_price: f64) -> bool {
        let entry = &mut self.entries[entry.0];
        if entry.unit_price.is_some() {
            return false;
        }
        entry.unit_price = Some(unit_price);
        true
    }

    /// Links an element to an entry once. Returns `true` for a new link.
    pub fn associate(&mut self, element_id: u64, entry: EntryId) -> bool {
        self.link(element_id, entry, false)
    }

    pub(crate) fn link(&mut self, element_id: u64, entry: EntryId, persisted: bool) -> bool {
        if !self.linked.insert((element_id, entry)) {
            return false;
        }
        self.associations.push(Association {
            element_id,
            entry,
            persisted,
        });
        true
    }

    #[must_use]
    pub fn is_linked(&self, element_id: u64, entry: EntryId) -> bool {
        self.linked.contains(&(element_id, entry))
    }

    /// Replaces unit labels with the catalogue's unit for the same code.
    pub fn refresh_units<'a, I>(&mut self, units_by_code: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let units: HashMap<&str, &str> = units_by_code.into_iter().collect();
        for entry in &mut self.entries {
            if let Some(label) = units.get(entry.code.as_str()) {
                if !label.trim().is_empty() {
                    entry.set_unit(label);
                }
            }
        }
    }

    #[must_use]
    pub fn schedules(&self) -> &[CostSchedule] {
        &self.schedules
    }

    #[must_use]
    pub fn schedule(&self, id: ScheduleId) -> &CostSchedule {
        &self.schedules[id.0]
    }

    pub(crate) fn schedule_mut(&mut self, id: ScheduleId) -> &mut CostSchedule {
        &mut self.schedules[id.0]
    }

    #[must_use]
    pub fn entries(&self) -> &[CostEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, id: EntryId) -> &CostEntry {
        &self.entries[id.0]
    }

    pub(crate) fn entry_mut(&mut self, id: EntryId) -> &mut CostEntry {
        &mut self.entries[id.0]
    }

    #[must_use]
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub(crate) fn associations_mut(&mut self) -> &mut [Association] {
        &mut self.associations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_is_unique_by_name() {
        let mut ledger = CostLedger::new();
        let a = ledger.ensure_schedule("Price List");
        let b = ledger.ensure_schedule("Price List");
        assert_eq!(a, b);
        assert_eq!(ledger.schedules().len(), 1);
    }

    #[test]
    fn test_entry_is_unique_by_code() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let first = ledger.ensure_entry(schedule, "B.01", "Concrete beam", "m3");
        let second = ledger.ensure_entry(schedule, "B.01", "Something else", "m");
        assert_eq!(first, second);
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entry(first).name, "Concrete beam");
        assert_eq!(ledger.entry(first).unit, CanonicalUnit::Volume);
    }

    #[test]
    fn test_same_code_in_other_schedule_is_distinct() {
        let mut ledger = CostLedger::new();
        let a = ledger.ensure_schedule("2024");
        let b = ledger.ensure_schedule("2025");
        let x = ledger.ensure_entry(a, "B.01", "Beam", "m3");
        let y = ledger.ensure_entry(b, "B.01", "Beam", "m3");
        assert_ne!(x, y);
    }

    #[test]
    fn test_entry_state_moves_forward() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        assert_eq!(ledger.entry_state(schedule, "C.01"), EntryState::Unseen);

        let entry = ledger.ensure_entry(schedule, "C.01", "Column", "m3");
        assert_eq!(ledger.entry_state(schedule, "C.01"), EntryState::EntryCreated);

        assert!(ledger.attach_price(entry, 120.0));
        assert_eq!(ledger.entry_state(schedule, "C.01"), EntryState::PriceAttached);

        assert!(!ledger.attach_price(entry, 999.0));
        assert_eq!(ledger.entry(entry).unit_price, Some(120.0));
    }

    #[test]
    fn test_association_is_created_once() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let entry = ledger.ensure_entry(schedule, "W.01", "Wall", "m2");
        assert!(ledger.associate(42, entry));
        assert!(!ledger.associate(42, entry));
        assert!(ledger.is_linked(42, entry));
        assert_eq!(ledger.associations().len(), 1);
    }

    #[test]
    fn test_refresh_units_from_catalogue() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let entry = ledger.ensure_entry(schedule, "S.01", "Slab", "");
        assert_eq!(ledger.entry(entry).unit, CanonicalUnit::Count);

        ledger.refresh_units([("S.01", "mq"), ("X.99", "m")]);
        assert_eq!(ledger.entry(entry).unit_label, "mq");
        assert_eq!(ledger.entry(entry).unit, CanonicalUnit::Area);
    }
}
