//! Cost assignment: pairs elements with catalogue rows and records the
//! result in the model's cost ledger.

use crate::catalogue::{best_match, CatalogueIndex, CatalogueRow};
use crate::model::{CostLedger, Element, EntryState, IfcModel};
use crate::units::CanonicalUnit;
use serde::Serialize;
use std::collections::HashSet;

/// Outcome counts of one assignment run. Every processed element lands in
/// exactly one of `assigned`, `already_linked`, `skipped_no_candidates`,
/// `skipped_no_match` and `skipped_malformed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub assigned: usize,
    pub already_linked: usize,
    pub skipped_no_candidates: usize,
    pub skipped_no_match: usize,
    pub skipped_malformed: usize,
    /// Pairings whose catalogue unit is not recognized. These are still
    /// assigned; their quantity resolves as unavailable.
    pub unrecognized_units: usize,
}

impl AssignmentSummary {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.assigned
            + self.already_linked
            + self.skipped_no_candidates
            + self.skipped_no_match
            + self.skipped_malformed
    }
}

/// Assigns every element to its best matching catalogue row.
///
/// Entries are created in the schedule named `schedule_name`, one per
/// catalogue code. The schedule is created on the first match, so a run
/// that assigns nothing leaves the ledger untouched. Running this twice with the same input
/// adds nothing the second time: existing entries, prices and links are
/// reused and reported as `already_linked`.
pub fn assign_all(
    elements: &[Element],
    rows: &[CatalogueRow],
    ledger: &mut CostLedger,
    schedule_name: &str,
) -> AssignmentSummary {
    let mut schedule = ledger.find_schedule(schedule_name);
    let index = CatalogueIndex::new(rows);
    let mut summary = AssignmentSummary::default();
    let mut warned_units: HashSet<&str> = HashSet::new();

    for element in elements {
        let candidates = index.candidates(element.class);
        if candidates.is_empty() {
            tracing::debug!(id = element.id, class = %element.class, "No catalogue rows for class");
            summary.skipped_no_candidates += 1;
            continue;
        }

        let Some(found) = best_match(element.descriptive_name(), candidates) else {
            summary.skipped_no_match += 1;
            continue;
        };
        let row = found.row;
        if row.code.is_empty() {
            tracing::debug!(id = element.id, line = row.line, "Matched row has no code");
            summary.skipped_no_match += 1;
            continue;
        }

        let priced = schedule
            .is_some_and(|id| ledger.entry_state(id, &row.code) == EntryState::PriceAttached);
        let price = if priced {
            None
        } else {
            match row.price() {
                Ok(price) => Some(price),
                Err(err) => {
                    tracing::warn!(id = element.id, code = %row.code, "{err}");
                    summary.skipped_malformed += 1;
                    continue;
                }
            }
        };

        let schedule = *schedule.get_or_insert_with(|| ledger.ensure_schedule(schedule_name));
        let entry = ledger.ensure_entry(schedule, &row.code, &row.description, &row.unit);
        if let Some(price) = price {
            ledger.attach_price(entry, price);
        }

        if let CanonicalUnit::Unrecognized(label) = row.canonical_unit() {
            if warned_units.insert(row.code.as_str()) {
                tracing::warn!(code = %row.code, unit = %label, "Catalogue unit is not recognized");
            }
            summary.unrecognized_units += 1;
        }

        if ledger.associate(element.id, entry) {
            tracing::debug!(
                id = element.id,
                name = %element.descriptive_name(),
                code = %row.code,
                score = found.score,
                "Assigned element"
            );
            summary.assigned += 1;
        } else {
            summary.already_linked += 1;
        }
    }

    tracing::info!(
        assigned = summary.assigned,
        already_linked = summary.already_linked,
        skipped_no_candidates = summary.skipped_no_candidates,
        skipped_no_match = summary.skipped_no_match,
        skipped_malformed = summary.skipped_malformed,
        "Cost assignment finished"
    );
    summary
}

impl IfcModel {
    /// Runs [`assign_all`] over the model's own elements and ledger.
    pub fn assign_costs(&mut self, rows: &[CatalogueRow], schedule_name: &str) -> AssignmentSummary {
        assign_all(&self.elements, rows, &mut self.costs, schedule_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::ClassFilter;
    use crate::model::{ElementClass, EntryId};
    use pretty_assertions::assert_eq;

    fn row(line: usize, code: &str, description: &str, price: &str, class: &str) -> CatalogueRow {
        CatalogueRow {
            line,
            code: code.to_string(),
            description: description.to_string(),
            unit: "m3".to_string(),
            raw_price: price.to_string(),
            unit_price: crate::catalogue::parse_decimal_eu(price),
            class_filter: ClassFilter::parse(class),
        }
    }

    fn elements() -> Vec<Element> {
        vec![
            Element::new(1, "g1", ElementClass::Beam).with_name("Concrete beam 300x600"),
            Element::new(2, "g2", ElementClass::Beam).with_name("Steel beam HEA200"),
            Element::new(3, "g3", ElementClass::Column).with_name("Concrete column"),
        ]
    }

    fn catalogue() -> Vec<CatalogueRow> {
        vec![
            row(1, "B.01", "Concrete beam", "1.250,00", "IfcBeam"),
            row(2, "B.02", "Steel beam", "980,50", "IfcBeam"),
        ]
    }

    #[test]
    fn test_assigns_best_rows() {
        let mut ledger = CostLedger::new();
        let summary = assign_all(&elements(), &catalogue(), &mut ledger, "Price List");

        assert_eq!(summary.assigned, 2);
        assert_eq!(summary.skipped_no_candidates, 1);
        assert_eq!(summary.processed(), 3);
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.entry(EntryId(0)).code, "B.01");
        assert_eq!(ledger.entry(EntryId(0)).unit_price, Some(1250.0));
        assert!(ledger.is_linked(1, EntryId(0)));
        assert!(ledger.is_linked(2, EntryId(1)));
    }

    #[test]
    fn test_second_run_adds_nothing() {
        let mut ledger = CostLedger::new();
        let elements = elements();
        let rows = catalogue();
        assign_all(&elements, &rows, &mut ledger, "Price List");
        let associations = ledger.associations().to_vec();

        let second = assign_all(&elements, &rows, &mut ledger, "Price List");
        assert_eq!(second.assigned, 0);
        assert_eq!(second.already_linked, 2);
        assert_eq!(ledger.associations(), associations.as_slice());
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.schedules().len(), 1);
    }

    #[test]
    fn test_shared_code_creates_one_entry() {
        let mut ledger = CostLedger::new();
        let elements = vec![
            Element::new(1, "g1", ElementClass::Beam).with_name("Concrete beam A"),
            Element::new(2, "g2", ElementClass::Beam).with_name("Concrete beam B"),
        ];
        let summary = assign_all(&elements, &catalogue(), &mut ledger, "Price List");
        assert_eq!(summary.assigned, 2);
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.associations().len(), 2);
    }

    #[test]
    fn test_any_class_rows_are_fallback() {
        let mut ledger = CostLedger::new();
        let rows = vec![
            row(1, "G.01", "Generic concrete", "100", ""),
            row(2, "B.01", "Concrete beam", "200", "IfcBeam"),
        ];
        let summary = assign_all(&elements(), &rows, &mut ledger, "Price List");
        assert_eq!(summary.assigned, 3);
        // The column falls back to the any-class row; beams never see it.
        let schedule = ledger.find_schedule("Price List").unwrap();
        let g01 = ledger.entry_by_code(schedule, "G.01").unwrap();
        assert!(ledger.is_linked(3, g01));
        assert!(!ledger.is_linked(1, g01));
    }

    #[test]
    fn test_malformed_price_is_counted() {
        let mut ledger = CostLedger::new();
        let rows = vec![row(4, "B.01", "Concrete beam", "call us", "IfcBeam")];
        let summary = assign_all(&elements(), &rows, &mut ledger, "Price List");
        assert_eq!(summary.skipped_malformed, 2);
        assert_eq!(summary.assigned, 0);
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn test_priced_entry_ignores_malformed_row() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let entry = ledger.ensure_entry(schedule, "B.01", "Concrete beam", "m3");
        ledger.attach_price(entry, 1250.0);

        let rows = vec![row(4, "B.01", "Concrete beam", "", "IfcBeam")];
        let summary = assign_all(&elements()[..1], &rows, &mut ledger, "Price List");
        assert_eq!(summary.assigned, 1);
        assert_eq!(ledger.entry(entry).unit_price, Some(1250.0));
    }

    #[test]
    fn test_unrecognized_unit_still_assigned() {
        let mut ledger = CostLedger::new();
        let mut rows = catalogue();
        rows[0].unit = "furlong".to_string();
        let summary = assign_all(&elements()[..1], &rows, &mut ledger, "Price List");
        assert_eq!(summary.assigned, 1);
        assert_eq!(summary.unrecognized_units, 1);
    }

    #[test]
    fn test_no_rows_skips_everything() {
        let mut ledger = CostLedger::new();
        let summary = assign_all(&elements(), &[], &mut ledger, "Price List");
        assert_eq!(summary.skipped_no_candidates, 3);
        assert_eq!(summary.assigned, 0);
        assert!(ledger.schedules().is_empty());
    }

    #[test]
    fn test_schedule_created_on_first_match() {
        let mut ledger = CostLedger::new();
        let rows = vec![row(4, "B.01", "Concrete beam", "call us", "IfcBeam")];
        assign_all(&elements(), &rows, &mut ledger, "Price List");
        assert!(ledger.schedules().is_empty());

        assign_all(&elements(), &catalogue(), &mut ledger, "Price List");
        assert_eq!(ledger.schedules().len(), 1);
        assert_eq!(ledger.schedules()[0].name, "Price List");
    }
}
