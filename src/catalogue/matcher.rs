//! Fuzzy pairing of model elements with catalogue rows.
//!
//! There is no identifier shared between the model and the price list, so
//! rows are paired by text similarity of the element name and the row
//! description. The best score always wins; there is no minimum threshold,
//! so poor matches are accepted.

use super::{CatalogueRow, ClassFilter};
use crate::model::ElementClass;
use std::collections::HashMap;

/// Rows grouped by the element class they apply to.
#[derive(Debug, Default)]
pub struct CatalogueIndex<'a> {
    by_class: HashMap<ElementClass, Vec<&'a CatalogueRow>>,
    any: Vec<&'a CatalogueRow>,
}

impl<'a> CatalogueIndex<'a> {
    #[must_use]
    pub fn new(rows: &'a [CatalogueRow]) -> Self {
        let mut index = Self::default();
        for row in rows {
            match &row.class_filter {
                ClassFilter::Class(class) => index.by_class.entry(*class).or_default().push(row),
                ClassFilter::Any => index.any.push(row),
                ClassFilter::Unsupported(name) => {
                    tracing::debug!(line = row.line, class = %name, "Row class is not structural");
                }
            }
        }
        index
    }

    /// Class-specific rows, or the any-class rows when none exist.
    #[must_use]
    pub fn candidates(&self, class: ElementClass) -> &[&'a CatalogueRow] {
        match self.by_class.get(&class) {
            Some(rows) if !rows.is_empty() => rows,
            _ => &self.any,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub row: &'a CatalogueRow,
    pub score: f64,
}

/// Picks the candidate whose description is most similar to `name`.
///
/// Ties go to the earliest candidate, so the result depends on catalogue
/// row order. Returns `None` only for an empty candidate list.
#[must_use]
pub fn best_match<'a>(name: &str, candidates: &[&'a CatalogueRow]) -> Option<Match<'a>> {
    let base = name.trim().to_lowercase();
    let mut best: Option<Match<'a>> = None;

    for &row in candidates {
        let score = similarity_ratio(&base, &row.description.trim().to_lowercase());
        match best {
            Some(current) if score <= current.score => {}
            _ => best = Some(Match { row, score }),
        }
    }

    best
}

/// Ratcliff/Obershelp similarity: `2 * M / T` where `M` is the number of
/// characters in matching blocks and `T` the total length of both strings.
/// Two empty strings are identical (1.0).
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_characters(&a, &b);
    2.0 * matches as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

// Longest common block in a[alo..ahi] x b[blo..bhi]; earliest in `a`, then
// earliest in `b`, on ties.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] {
                cur[k] = prev[k - 1] + 1;
                if cur[k] > best_size {
                    best_size = cur[k];
                    best_i = i + 1 - best_size;
                    best_j = j + 1 - best_size;
                }
            } else {
                cur[k] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(line: usize, code: &str, description: &str, filter: ClassFilter) -> CatalogueRow {
        CatalogueRow {
            line,
            code: code.to_string(),
            description: description.to_string(),
            unit: "m3".to_string(),
            raw_price: "100".to_string(),
            unit_price: Some(100.0),
            class_filter: filter,
        }
    }

    #[test]
    fn test_ratio_known_values() {
        assert_relative_eq!(similarity_ratio("abcd", "bcde"), 0.75);
        assert_relative_eq!(similarity_ratio("beam", "beam"), 1.0);
        assert_relative_eq!(similarity_ratio("", ""), 1.0);
        assert_relative_eq!(similarity_ratio("abc", ""), 0.0);
        assert_relative_eq!(similarity_ratio("abc", "xyz"), 0.0);
        // "abxcd" vs "abcd": blocks "ab" + "cd"
        assert_relative_eq!(similarity_ratio("abxcd", "abcd"), 8.0 / 9.0);
    }

    #[test]
    fn test_best_match_picks_highest() {
        let rows = vec![
            row(1, "B.01", "Steel beam HEA", ClassFilter::Any),
            row(2, "B.02", "Concrete beam C30/37", ClassFilter::Any),
        ];
        let candidates: Vec<&CatalogueRow> = rows.iter().collect();
        let found = best_match("  CONCRETE BEAM 300x600 ", &candidates).unwrap();
        assert_eq!(found.row.code, "B.02");
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let rows = vec![
            row(1, "A", "same", ClassFilter::Any),
            row(2, "B", "same", ClassFilter::Any),
        ];
        let candidates: Vec<&CatalogueRow> = rows.iter().collect();
        assert_eq!(best_match("same", &candidates).unwrap().row.code, "A");
    }

    #[test]
    fn test_no_candidates_no_match() {
        assert!(best_match("beam", &[]).is_none());
    }

    #[test]
    fn test_index_prefers_class_rows_then_any() {
        let rows = vec![
            row(1, "G", "generic", ClassFilter::Any),
            row(2, "B", "beam", ClassFilter::Class(ElementClass::Beam)),
            row(3, "D", "door", ClassFilter::Unsupported("IfcDoor".into())),
        ];
        let index = CatalogueIndex::new(&rows);
        let beams = index.candidates(ElementClass::Beam);
        assert_eq!(beams.len(), 1);
        assert_eq!(beams[0].code, "B");

        let walls = index.candidates(ElementClass::Wall);
        assert_eq!(walls.len(), 1);
        assert_eq!(walls[0].code, "G");
    }

    #[test]
    fn test_empty_index_has_no_candidates() {
        let rows = vec![row(1, "B", "beam", ClassFilter::Class(ElementClass::Beam))];
        let index = CatalogueIndex::new(&rows);
        assert!(index.candidates(ElementClass::Slab).is_empty());
    }
}
