//! Bill of quantities: sums resolved element quantities per cost entry,
//! optionally split by level, and prices them.
//!
//! Lines are sorted by code, description and level, so the output depends
//! only on the ledger contents and not on element or association order.

use crate::model::{CostLedger, Element, EntryId, IfcModel};
use crate::quantity::{QuantityResolver, Unavailable};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Level bucket for elements without a discoverable storey.
pub const NO_LEVEL: &str = "(no level)";

/// How an unavailable quantity enters a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum UnavailablePolicy {
    /// The element contributes one unit of the entry's measure.
    #[default]
    CountAsOne,
    /// The element contributes nothing; it is still counted as unavailable.
    Exclude,
}

impl UnavailablePolicy {
    #[must_use]
    pub fn apply(self, resolved: &Result<f64, Unavailable>) -> Option<f64> {
        match (resolved, self) {
            (Ok(quantity), _) => Some(*quantity),
            (Err(_), Self::CountAsOne) => Some(1.0),
            (Err(_), Self::Exclude) => None,
        }
    }
}

/// One report line: a cost entry, optionally restricted to one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedLine {
    pub code: String,
    pub description: String,
    /// Unit label, `-` when the entry has none.
    pub unit: String,
    pub level: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub line_total: f64,
    pub element_count: usize,
    /// Elements whose quantity was unavailable, whatever the policy did.
    pub unavailable_count: usize,
}

/// Aggregated cost report. Lines are sorted by code, description, level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BillOfQuantities {
    pub lines: Vec<AggregatedLine>,
    pub grand_total: f64,
    pub unavailable: usize,
}

impl BillOfQuantities {
    fn from_lines(mut lines: Vec<AggregatedLine>) -> Self {
        lines.sort_by(|a, b| {
            (&a.code, &a.description, &a.level).cmp(&(&b.code, &b.description, &b.level))
        });
        let grand_total = lines.iter().map(|line| line.line_total).sum();
        let unavailable = lines.iter().map(|line| line.unavailable_count).sum();
        Self {
            lines,
            grand_total,
            unavailable,
        }
    }

    /// The same report with level buckets merged into one line per entry.
    #[must_use]
    pub fn totals(&self) -> Self {
        let mut merged: Vec<AggregatedLine> = Vec::new();
        for line in &self.lines {
            match merged.last_mut() {
                Some(last)
                    if last.code == line.code
                        && last.description == line.description
                        && last.unit == line.unit
                        && last.unit_price == line.unit_price =>
                {
                    last.quantity += line.quantity;
                    last.line_total += line.line_total;
                    last.element_count += line.element_count;
                    last.unavailable_count += line.unavailable_count;
                }
                _ => merged.push(AggregatedLine {
                    level: None,
                    ..line.clone()
                }),
            }
        }
        Self::from_lines(merged)
    }

    /// Sum of line totals per entry, in line order.
    #[must_use]
    pub fn entry_subtotals(&self) -> Vec<(&str, f64)> {
        let mut subtotals: Vec<(&str, f64)> = Vec::new();
        for line in &self.lines {
            match subtotals.last_mut() {
                Some((code, total)) if *code == line.code => *total += line.line_total,
                _ => subtotals.push((&line.code, line.line_total)),
            }
        }
        subtotals
    }
}

#[derive(Default)]
struct Bucket {
    quantity: f64,
    elements: usize,
    unavailable: usize,
}

/// Sums associated element quantities per cost entry (and per level when
/// `group_by_level` is set) and prices them.
///
/// Entries without a unit price are priced at zero. The result depends only
/// on the ledger contents, so repeated runs produce identical output.
#[must_use]
pub fn aggregate(
    ledger: &CostLedger,
    elements: &[Element],
    resolver: &QuantityResolver,
    group_by_level: bool,
    policy: UnavailablePolicy,
) -> BillOfQuantities {
    let by_id: HashMap<u64, &Element> = elements.iter().map(|e| (e.id, e)).collect();
    let mut buckets: BTreeMap<(EntryId, Option<String>), Bucket> = BTreeMap::new();

    for association in ledger.associations() {
        let Some(element) = by_id.get(&association.element_id) else {
            tracing::warn!(id = association.element_id, "Association to unknown element");
            continue;
        };
        let entry = ledger.entry(association.entry);

        let level = group_by_level
            .then(|| element.level.clone().unwrap_or_else(|| NO_LEVEL.to_string()));
        let bucket = buckets.entry((association.entry, level)).or_default();
        bucket.elements += 1;

        let resolved = resolver.resolve(element, &entry.unit);
        if let Err(reason) = &resolved {
            tracing::debug!(id = element.id, code = %entry.code, %reason, "Quantity unavailable");
            bucket.unavailable += 1;
        }
        if let Some(quantity) = policy.apply(&resolved) {
            bucket.quantity += quantity;
        }
    }

    let lines = buckets
        .into_iter()
        .map(|((entry_id, level), bucket)| {
            let entry = ledger.entry(entry_id);
            let unit_price = entry.unit_price.unwrap_or_else(|| {
                tracing::warn!(code = %entry.code, "Cost entry has no unit price");
                0.0
            });
            AggregatedLine {
                code: entry.code.clone(),
                description: entry.name.clone(),
                unit: if entry.unit_label.is_empty() {
                    "-".to_string()
                } else {
                    entry.unit_label.clone()
                },
                level,
                quantity: bucket.quantity,
                unit_price,
                line_total: bucket.quantity * unit_price,
                element_count: bucket.elements,
                unavailable_count: bucket.unavailable,
            }
        })
        .collect();

    let bill = BillOfQuantities::from_lines(lines);
    tracing::info!(
        lines = bill.lines.len(),
        grand_total = bill.grand_total,
        unavailable = bill.unavailable,
        "Aggregated bill of quantities"
    );
    bill
}

impl IfcModel {
    /// Runs [`aggregate`] with a resolver at the model's declared scales.
    #[must_use]
    pub fn bill_of_quantities(
        &self,
        group_by_level: bool,
        policy: UnavailablePolicy,
    ) -> BillOfQuantities {
        let resolver = QuantityResolver::new(self.scales());
        aggregate(&self.costs, &self.elements, &resolver, group_by_level, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseQuantities, ElementClass};
    use crate::units::{ProjectScales, Scale};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn volume(v: f64) -> BaseQuantities {
        BaseQuantities {
            volume: Some(v),
            ..BaseQuantities::default()
        }
    }

    // Two entries, three elements split 2/1.
    fn fixture() -> (CostLedger, Vec<Element>) {
        let elements = vec![
            Element::new(1, "a", ElementClass::Beam)
                .with_quantities(volume(1.5))
                .with_level("Level 1"),
            Element::new(2, "b", ElementClass::Beam)
                .with_quantities(volume(2.25))
                .with_level("Level 2"),
            Element::new(3, "c", ElementClass::Column).with_quantities(volume(0.4)),
        ];

        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let beams = ledger.ensure_entry(schedule, "B.01", "Concrete beam", "m3");
        let columns = ledger.ensure_entry(schedule, "A.01", "Concrete column", "m3");
        ledger.attach_price(beams, 1000.0);
        ledger.attach_price(columns, 1200.0);
        ledger.associate(1, beams);
        ledger.associate(3, columns);
        ledger.associate(2, beams);
        (ledger, elements)
    }

    fn resolver() -> QuantityResolver {
        QuantityResolver::new(ProjectScales::uniform(Scale::Base))
    }

    #[test]
    fn test_grand_total_equals_hand_sum() {
        let (ledger, elements) = fixture();
        let bill = aggregate(&ledger, &elements, &resolver(), false, UnavailablePolicy::CountAsOne);

        assert_eq!(bill.lines.len(), 2);
        assert_eq!(bill.lines[0].code, "A.01");
        assert_eq!(bill.lines[1].code, "B.01");
        assert_eq!(bill.lines[1].element_count, 2);
        assert_relative_eq!(bill.lines[1].quantity, 3.75, epsilon = 1e-9);
        assert_relative_eq!(bill.lines[0].line_total, 480.0, epsilon = 1e-9);
        assert_relative_eq!(bill.grand_total, 3750.0 + 480.0, epsilon = 1e-9);
    }

    #[test]
    fn test_group_by_level_uses_sentinel() {
        let (ledger, elements) = fixture();
        let bill = aggregate(&ledger, &elements, &resolver(), true, UnavailablePolicy::CountAsOne);

        let levels: Vec<(&str, Option<&str>)> = bill
            .lines
            .iter()
            .map(|l| (l.code.as_str(), l.level.as_deref()))
            .collect();
        assert_eq!(
            levels,
            vec![
                ("A.01", Some(NO_LEVEL)),
                ("B.01", Some("Level 1")),
                ("B.01", Some("Level 2")),
            ]
        );
        assert_eq!(bill.entry_subtotals().len(), 2);
        assert_relative_eq!(bill.totals().grand_total, bill.grand_total, epsilon = 1e-9);
        assert_eq!(bill.totals().lines.len(), 2);
    }

    #[test]
    fn test_unavailable_policies() {
        let (mut ledger, mut elements) = fixture();
        elements.push(Element::new(4, "d", ElementClass::Beam));
        let beams = ledger.entry_by_code(ledger.find_schedule("Price List").unwrap(), "B.01").unwrap();
        ledger.associate(4, beams);

        let counted = aggregate(&ledger, &elements, &resolver(), false, UnavailablePolicy::CountAsOne);
        assert_relative_eq!(counted.lines[1].quantity, 4.75, epsilon = 1e-9);
        assert_eq!(counted.lines[1].unavailable_count, 1);

        let excluded = aggregate(&ledger, &elements, &resolver(), false, UnavailablePolicy::Exclude);
        assert_relative_eq!(excluded.lines[1].quantity, 3.75, epsilon = 1e-9);
        assert_eq!(excluded.unavailable, 1);
    }

    #[test]
    fn test_output_is_stable() {
        let (ledger, elements) = fixture();
        let first = aggregate(&ledger, &elements, &resolver(), true, UnavailablePolicy::CountAsOne);
        let second = aggregate(&ledger, &elements, &resolver(), true, UnavailablePolicy::CountAsOne);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_missing_price_is_zero() {
        let mut ledger = CostLedger::new();
        let schedule = ledger.ensure_schedule("Price List");
        let entry = ledger.ensure_entry(schedule, "X", "Unpriced", "");
        ledger.associate(1, entry);
        let elements = vec![Element::new(1, "a", ElementClass::Slab)];

        let bill = aggregate(&ledger, &elements, &resolver(), false, UnavailablePolicy::CountAsOne);
        assert_eq!(bill.lines[0].unit, "-");
        assert_eq!(bill.lines[0].quantity, 1.0);
        assert_eq!(bill.grand_total, 0.0);
    }
}
