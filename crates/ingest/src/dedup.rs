use core::fmt;
use std::collections::HashMap;

use crate::row::CleanRow;

/// SKUs that occurred more than once in a file, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateNotice {
    pub skus: Vec<String>,
}

impl fmt::Display for DuplicateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duplicate SKUs removed in file: [{}]", self.skus.join(", "))
    }
}

/// Keep only the last row for every SKU, preserving the relative order of
/// the survivors.
pub fn resolve_duplicates(rows: Vec<CleanRow>) -> (Vec<CleanRow>, Option<DuplicateNotice>) {
    let mut last: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut first_order: Vec<&str> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        last.insert(row.sku.as_str(), idx);
        let count = seen.entry(row.sku.as_str()).or_insert(0);
        if *count == 0 {
            first_order.push(row.sku.as_str());
        }
        *count += 1;
    }

    let duplicated: Vec<String> = first_order
        .into_iter()
        .filter(|sku| seen.get(sku).copied().unwrap_or_default() > 1)
        .map(str::to_string)
        .collect();
    let keep: Vec<bool> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| last.get(row.sku.as_str()) == Some(&idx))
        .collect();

    let survivors = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();

    let notice = (!duplicated.is_empty()).then(|| DuplicateNotice { skus: duplicated });
    (survivors, notice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn row(number: usize, sku: &str, name: &str) -> CleanRow {
        CleanRow {
            number,
            sku: sku.to_string(),
            name: name.to_string(),
            category: "Tools".to_string(),
            status: "active".to_string(),
            price: Decimal::ONE,
            stock_qty: 1,
        }
    }

    #[test]
    fn last_occurrence_wins() {
        let (rows, notice) = resolve_duplicates(vec![
            row(1, "A1", "first"),
            row(2, "B2", "other"),
            row(3, "A1", "second"),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sku, "B2");
        assert_eq!(rows[1].name, "second");
        assert_eq!(
            notice.unwrap().to_string(),
            "Duplicate SKUs removed in file: [A1]"
        );
    }

    #[test]
    fn notice_lists_skus_in_first_appearance_order() {
        let (_, notice) = resolve_duplicates(vec![
            row(1, "Z9", "a"),
            row(2, "A1", "b"),
            row(3, "A1", "c"),
            row(4, "Z9", "d"),
            row(5, "Z9", "e"),
        ]);
        assert_eq!(notice.unwrap().skus, vec!["Z9", "A1"]);
    }

    #[test]
    fn unique_rows_pass_untouched() {
        let input = vec![row(1, "A1", "a"), row(2, "B2", "b")];
        let (rows, notice) = resolve_duplicates(input.clone());
        assert_eq!(rows, input);
        assert!(notice.is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            #[test]
            fn survivors_are_unique_and_are_the_last_rows(skus in proptest::collection::vec("[A-D][0-2]", 0..40)) {
                let input: Vec<CleanRow> = skus
                    .iter()
                    .enumerate()
                    .map(|(i, s)| row(i + 1, s, &format!("row{}", i + 1)))
                    .collect();

                let (rows, notice) = resolve_duplicates(input.clone());

                let distinct: HashSet<&str> = skus.iter().map(String::as_str).collect();
                prop_assert_eq!(rows.len(), distinct.len());

                let mut seen = HashSet::new();
                for r in &rows {
                    prop_assert!(seen.insert(r.sku.clone()));
                    let last = input.iter().rev().find(|x| x.sku == r.sku).map(|x| x.number);
                    prop_assert_eq!(Some(r.number), last);
                }

                // Relative order of survivors is preserved.
                prop_assert!(rows.windows(2).all(|w| w[0].number < w[1].number));

                let dup_count = distinct
                    .iter()
                    .filter(|s| skus.iter().filter(|x| x == *s).count() > 1)
                    .count();
                prop_assert_eq!(notice.map(|n| n.skus.len()).unwrap_or(0), dup_count);
            }
        }
    }
}
