//! Change detection between consecutive runs.

use std::collections::HashSet;

use crate::products::{Category, ProductRecord, ProductState};
use crate::signals::{Delta, SignalChange, SignalMap};

/// Compare the previous run's signals against the current ones.
///
/// Returns `None` when there is nothing to report: either there was no
/// previous run (the current map silently becomes the baseline) or every key
/// in the union of both maps carries the same value. A key missing from one
/// side counts as `0`, so a newly appearing signal shows up as a change from
/// zero.
#[must_use]
pub fn compute_delta(previous: Option<&SignalMap>, current: &SignalMap) -> Option<Delta> {
    let previous = previous?;

    let delta: Delta = previous
        .keys()
        .chain(current.keys())
        .filter_map(|key| {
            let old = previous.get(key).copied().unwrap_or(0);
            let new = current.get(key).copied().unwrap_or(0);
            (old != new).then(|| (key.clone(), SignalChange::new(old, new)))
        })
        .collect();

    if delta.is_empty() {
        None
    } else {
        Some(delta)
    }
}

/// Products in `current` whose id does not appear in `previous` for the same
/// category. Name and price changes on a known id are ignored.
#[must_use]
pub fn find_new_products<'a>(
    previous: &ProductState,
    current: &'a ProductState,
    category: Category,
) -> Vec<&'a ProductRecord> {
    let known: HashSet<&str> = previous
        .category(category)
        .iter()
        .map(|p| p.id.as_str())
        .collect();

    current
        .category(category)
        .iter()
        .filter(|p| !known.contains(p.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn signals(pairs: &[(&str, u64)]) -> SignalMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn product(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Product {id}"),
            url: format!("https://www.sheinindia.in/item-p-{id}"),
            price: "₹799".to_string(),
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn first_run_reports_no_changes() {
        let current = signals(&[("total", 10), ("men", 3)]);
        assert!(compute_delta(None, &current).is_none());
    }

    #[test]
    fn identical_maps_report_no_changes() {
        let previous = signals(&[("total", 10), ("men", 3)]);
        let current = previous.clone();
        assert!(compute_delta(Some(&previous), &current).is_none());
    }

    #[test]
    fn explicit_zero_matches_missing_key() {
        let previous = signals(&[("total", 10), ("men", 0)]);
        let current = signals(&[("total", 10)]);
        assert!(compute_delta(Some(&previous), &current).is_none());
    }

    #[test]
    fn changed_and_new_keys_are_reported() {
        let previous = signals(&[("total", 100), ("men", 5)]);
        let current = signals(&[("total", 105), ("men", 5), ("women", 40)]);

        let delta = compute_delta(Some(&previous), &current).expect("expected changes");

        assert_eq!(delta.len(), 2);
        assert_eq!(
            delta["total"],
            SignalChange {
                old: 100,
                new: 105,
                diff: 5
            }
        );
        assert_eq!(
            delta["women"],
            SignalChange {
                old: 0,
                new: 40,
                diff: 40
            }
        );
        assert!(!delta.contains_key("men"));
    }

    #[test]
    fn disappearing_key_is_a_drop_to_zero() {
        let previous = signals(&[("total", 100), ("visible_products", 48)]);
        let current = signals(&[("total", 100)]);

        let delta = compute_delta(Some(&previous), &current).expect("expected changes");
        assert_eq!(delta["visible_products"].new, 0);
        assert_eq!(delta["visible_products"].diff, -48);
    }

    #[test]
    fn every_delta_entry_is_consistent() {
        let previous = signals(&[("a", 1), ("b", 2), ("c", 3), ("d", 9)]);
        let current = signals(&[("a", 1), ("b", 7), ("c", 0), ("e", 4)]);

        let delta = compute_delta(Some(&previous), &current).expect("expected changes");
        for change in delta.values() {
            assert_ne!(change.old, change.new);
            assert_eq!(
                change.diff,
                i64::try_from(change.new).unwrap() - i64::try_from(change.old).unwrap()
            );
        }
        let keys: Vec<&str> = delta.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "c", "d", "e"]);
    }

    #[test]
    fn new_products_are_found_by_id() {
        let previous = ProductState {
            men: vec![product("1"), product("2"), product("3")],
            ..ProductState::default()
        };
        let current = ProductState {
            men: vec![product("2"), product("3"), product("4")],
            ..ProductState::default()
        };

        let new_items = find_new_products(&previous, &current, Category::Men);
        assert_eq!(new_items.len(), 1);
        assert_eq!(new_items[0].id, "4");
    }

    #[test]
    fn renamed_product_with_known_id_is_not_new() {
        let previous = ProductState {
            men: vec![product("1")],
            ..ProductState::default()
        };
        let mut renamed = product("1");
        renamed.name = "Relaunched".to_string();
        renamed.price = "₹299".to_string();
        let current = ProductState {
            men: vec![renamed],
            ..ProductState::default()
        };

        assert!(find_new_products(&previous, &current, Category::Men).is_empty());
    }

    #[test]
    fn categories_are_compared_independently() {
        let previous = ProductState {
            women: vec![product("9")],
            ..ProductState::default()
        };
        let current = ProductState {
            men: vec![product("9")],
            ..ProductState::default()
        };

        let new_men = find_new_products(&previous, &current, Category::Men);
        assert_eq!(new_men.len(), 1);
        assert!(find_new_products(&previous, &current, Category::Women).is_empty());
    }
}
