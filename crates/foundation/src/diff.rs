//! Positional diff between two ordered sequences.
//!
//! Used to reconcile list-like state (layer order, selection lists) without
//! rebuilding it: every element is classified as added, left (present in
//! both lists, possibly moved) or removed, together with its old and new
//! positions.
//!
//! Ordering contract of the result:
//! - added entries, in new-list order;
//! - left entries, ascending by new position;
//! - removed entries, in old-list order.

/// Classification of a single [`DiffEntry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiffKind {
    Added,
    Left,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry<T> {
    pub element: T,
    /// Position in the old list. `None` for added elements.
    pub old_index: Option<usize>,
    /// Position in the merged ordering (new list with removed elements
    /// spliced back at their old positions). `None` for removed elements.
    pub new_index: Option<usize>,
}

impl<T> DiffEntry<T> {
    pub fn kind(&self) -> DiffKind {
        match (self.old_index, self.new_index) {
            (None, _) => DiffKind::Added,
            (_, None) => DiffKind::Removed,
            _ => DiffKind::Left,
        }
    }

    pub fn is_added(&self) -> bool {
        self.kind() == DiffKind::Added
    }

    pub fn is_removed(&self) -> bool {
        self.kind() == DiffKind::Removed
    }

    /// A left element whose position changed.
    pub fn is_moved(&self) -> bool {
        self.kind() == DiffKind::Left && self.old_index != self.new_index
    }
}

/// Computes the positional diff from `old` to `new`.
///
/// Elements are matched by equality; with duplicate elements the first equal
/// element wins every position lookup. Pass comparable keys (ids) rather
/// than whole records.
pub fn array_diff<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<DiffEntry<T>> {
    let removed: Vec<(usize, &T)> = old
        .iter()
        .enumerate()
        .filter(|(_, e)| !new.contains(e))
        .collect();

    // New order, then every removed element back at its old slot.
    let mut merged: Vec<&T> = new.iter().collect();
    for (old_index, element) in &removed {
        let at = (*old_index).min(merged.len());
        merged.insert(at, element);
    }

    let mut added = Vec::new();
    let mut left = Vec::new();
    for (new_index, element) in new.iter().enumerate() {
        let position = merged_position(&merged, element, new_index);
        match old.iter().position(|o| o == element) {
            None => added.push(DiffEntry {
                element: element.clone(),
                old_index: None,
                new_index: Some(position),
            }),
            Some(old_index) => left.push(DiffEntry {
                element: element.clone(),
                old_index: Some(old_index),
                new_index: Some(position),
            }),
        }
    }
    left.sort_by_key(|e| e.new_index);

    let mut out = Vec::with_capacity(added.len() + left.len() + removed.len());
    out.extend(added);
    out.extend(left);
    out.extend(removed.into_iter().map(|(old_index, element)| DiffEntry {
        element: element.clone(),
        old_index: Some(old_index),
        new_index: None,
    }));
    out
}

fn merged_position<T: PartialEq>(merged: &[&T], element: &T, fallback: usize) -> usize {
    merged
        .iter()
        .position(|m| *m == element)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::{DiffEntry, DiffKind, array_diff};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn entry(element: &'static str, old: Option<usize>, new: Option<usize>) -> DiffEntry<&'static str> {
        DiffEntry {
            element,
            old_index: old,
            new_index: new,
        }
    }

    #[test]
    fn shift_left_with_one_added_and_one_removed() {
        let got = array_diff(&["x", "y", "z"], &["y", "z", "w"]);
        assert_eq!(
            got,
            vec![
                entry("w", None, Some(3)),
                entry("y", Some(1), Some(1)),
                entry("z", Some(2), Some(2)),
                entry("x", Some(0), None),
            ]
        );
    }

    #[test]
    fn empty_old_list_adds_everything() {
        let got = array_diff(&[], &["a", "b"]);
        assert_eq!(
            got,
            vec![entry("a", None, Some(0)), entry("b", None, Some(1))]
        );
    }

    #[test]
    fn empty_new_list_removes_everything() {
        let got = array_diff(&["a", "b"], &[]);
        assert_eq!(
            got,
            vec![entry("a", Some(0), None), entry("b", Some(1), None)]
        );
    }

    #[test]
    fn swap_reports_moves_sorted_by_new_position() {
        let got = array_diff(&["a", "b", "c"], &["c", "a", "b"]);
        assert_eq!(
            got,
            vec![
                entry("c", Some(2), Some(0)),
                entry("a", Some(0), Some(1)),
                entry("b", Some(1), Some(2)),
            ]
        );
        assert!(got[0].is_moved());
    }

    #[test]
    fn removed_past_the_end_is_appended() {
        // Both "a"s survive through a single "a", so slot 2 is past the end.
        let got = array_diff(&["a", "a", "b"], &["a"]);
        assert_eq!(
            got,
            vec![entry("a", Some(0), Some(0)), entry("b", Some(2), None)]
        );
    }

    #[test]
    fn removed_elements_keep_their_slot_in_new_positions() {
        let got = array_diff(&["a", "b", "c", "d"], &["c", "a"]);
        // merged ordering: c, b, a, d
        assert_eq!(
            got,
            vec![
                entry("c", Some(2), Some(0)),
                entry("a", Some(0), Some(2)),
                entry("b", Some(1), None),
                entry("d", Some(3), None),
            ]
        );
    }

    #[test]
    fn kinds_are_derived_from_indices() {
        assert_eq!(entry("a", None, Some(0)).kind(), DiffKind::Added);
        assert_eq!(entry("a", Some(0), None).kind(), DiffKind::Removed);
        assert_eq!(entry("a", Some(0), Some(0)).kind(), DiffKind::Left);
        assert!(!entry("a", Some(0), Some(0)).is_moved());
    }

    proptest! {
        #[test]
        fn identical_lists_only_leave(list in proptest::collection::vec(0u8..20, 0..24)) {
            let got = array_diff(&list, &list);
            prop_assert_eq!(got.len(), list.len());
            for e in &got {
                prop_assert_eq!(e.kind(), DiffKind::Left);
                prop_assert_eq!(e.old_index, e.new_index);
            }
        }

        #[test]
        fn every_element_is_accounted_once(
            old in proptest::collection::hash_set(0u16..40, 0..16),
            new in proptest::collection::hash_set(0u16..40, 0..16),
        ) {
            let old: Vec<u16> = old.into_iter().collect();
            let new: Vec<u16> = new.into_iter().collect();
            let got = array_diff(&old, &new);

            for o in &old {
                let n = got.iter().filter(|e| &e.element == o && e.old_index.is_some()).count();
                prop_assert_eq!(n, 1);
            }
            for x in &new {
                let n = got.iter().filter(|e| &e.element == x && e.new_index.is_some()).count();
                prop_assert_eq!(n, 1);
            }

            let kinds: Vec<DiffKind> = got.iter().map(|e| e.kind()).collect();
            let mut sorted = kinds.clone();
            sorted.sort_by_key(|k| match k {
                DiffKind::Added => 0,
                DiffKind::Left => 1,
                DiffKind::Removed => 2,
            });
            prop_assert_eq!(kinds, sorted);

            let unique: HashSet<u16> = got.iter().map(|e| e.element).collect();
            prop_assert_eq!(unique.len(), got.len());
        }
    }
}
