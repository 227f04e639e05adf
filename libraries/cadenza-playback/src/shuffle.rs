//! Shuffle-order maintenance for concatenations
//!
//! A [`ShuffleOrder`] is a dense permutation of a concatenation's child
//! indices. Generation is a uniformly random Fisher-Yates shuffle; structural
//! mutations repair the permutation in place so that untouched children keep
//! their relative shuffle order (a reshuffle would lose it).

use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Permutation of a concatenation's child indices
///
/// Invariant: always a dense permutation of `[0, len)` - no duplicates, no
/// gaps, no out-of-range entries. Every mutation below preserves this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleOrder {
    order: Vec<usize>,
}

impl ShuffleOrder {
    /// The identity permutation over `count` children
    pub fn identity(count: usize) -> Self {
        Self {
            order: (0..count).collect(),
        }
    }

    /// A uniformly random permutation over `count` children
    pub fn random(count: usize) -> Self {
        let mut order: Vec<usize> = (0..count).collect();
        order.shuffle(&mut thread_rng());
        Self { order }
    }

    /// Restore a permutation from raw indices
    ///
    /// Returns `None` unless `indices` is a dense permutation of
    /// `[0, indices.len())`.
    pub fn from_indices(indices: Vec<usize>) -> Option<Self> {
        if !is_permutation(&indices) {
            return None;
        }
        Some(Self { order: indices })
    }

    /// Number of children covered by the permutation
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the permutation covers zero children
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The child indices in shuffle-traversal order
    pub fn indices(&self) -> &[usize] {
        &self.order
    }

    /// Regenerate the permutation wholesale (explicit reshuffle request)
    pub fn reshuffle(&mut self) {
        self.order.shuffle(&mut thread_rng());
    }

    /// Repair after a child insertion at `index`
    ///
    /// Existing entries at or above `index` shift up by one; the new child is
    /// spliced into the shuffle order at a uniformly random position. The
    /// relative shuffle order of all pre-existing children is preserved.
    pub fn insert(&mut self, index: usize) {
        for entry in &mut self.order {
            if *entry >= index {
                *entry += 1;
            }
        }
        let position = thread_rng().gen_range(0..=self.order.len());
        self.order.insert(position, index);
    }

    /// Repair after removal of children `[start, end)`
    ///
    /// Entries referencing removed indices are dropped; all remaining entries
    /// are renumbered to stay dense.
    pub fn remove_range(&mut self, start: usize, end: usize) {
        let removed = end - start;
        self.order.retain(|&entry| entry < start || entry >= end);
        for entry in &mut self.order {
            if *entry >= end {
                *entry -= removed;
            }
        }
    }

    /// Repair after moving the child at `from` to `to`
    ///
    /// Entries are renumbered so each one keeps tracking the same logical
    /// child; shuffle positions themselves do not change, so the child that
    /// was n-th to play is still n-th to play.
    pub fn move_entry(&mut self, from: usize, to: usize) {
        for entry in &mut self.order {
            if *entry == from {
                *entry = to;
            } else if from < to && *entry > from && *entry <= to {
                *entry -= 1;
            } else if to < from && *entry >= to && *entry < from {
                *entry += 1;
            }
        }
    }
}

/// Check that `indices` is a dense permutation of `[0, indices.len())`
pub fn is_permutation(indices: &[usize]) -> bool {
    let mut seen = vec![false; indices.len()];
    for &index in indices {
        if index >= indices.len() || seen[index] {
            return false;
        }
        seen[index] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(order: &ShuffleOrder) {
        assert!(
            is_permutation(order.indices()),
            "not a permutation: {:?}",
            order.indices()
        );
    }

    /// Map a post-insertion entry back to the child it referred to before the
    /// insertion at `at` (the spliced-in newcomer maps to `None`).
    fn pre_insert_child(entry: usize, at: usize) -> Option<usize> {
        match entry.cmp(&at) {
            std::cmp::Ordering::Less => Some(entry),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(entry - 1),
        }
    }

    #[test]
    fn identity_is_in_order() {
        let order = ShuffleOrder::identity(4);
        assert_eq!(order.indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn random_is_a_permutation() {
        for count in [0, 1, 2, 7, 40] {
            assert_valid(&ShuffleOrder::random(count));
        }
    }

    #[test]
    fn from_indices_rejects_non_permutations() {
        assert!(ShuffleOrder::from_indices(vec![0, 0, 1]).is_none());
        assert!(ShuffleOrder::from_indices(vec![1, 2, 3]).is_none());
        assert!(ShuffleOrder::from_indices(vec![2, 0, 1]).is_some());
        assert!(ShuffleOrder::from_indices(vec![]).is_some());
    }

    #[test]
    fn insert_preserves_relative_order() {
        let mut order = ShuffleOrder::from_indices(vec![2, 0, 3, 1]).unwrap();
        order.insert(2);
        assert_valid(&order);
        assert_eq!(order.len(), 5);

        // Stripping the newcomer and undoing the index shift must give back
        // the original order exactly.
        let survivors: Vec<usize> = order
            .indices()
            .iter()
            .filter_map(|&entry| pre_insert_child(entry, 2))
            .collect();
        assert_eq!(survivors, vec![2, 0, 3, 1]);
    }

    #[test]
    fn insert_at_end_of_child_list() {
        let mut order = ShuffleOrder::from_indices(vec![1, 0]).unwrap();
        order.insert(2);
        assert_valid(&order);
        assert!(order.indices().contains(&2));
    }

    #[test]
    fn insert_into_empty() {
        let mut order = ShuffleOrder::identity(0);
        order.insert(0);
        assert_eq!(order.indices(), &[0]);
    }

    #[test]
    fn remove_range_renumbers_densely() {
        let mut order = ShuffleOrder::from_indices(vec![4, 1, 3, 0, 2]).unwrap();
        order.remove_range(1, 3);
        assert_valid(&order);
        // Children 1 and 2 are gone; 0 stays 0, 3 -> 1, 4 -> 2.
        assert_eq!(order.indices(), &[2, 1, 0]);
    }

    #[test]
    fn remove_whole_range_empties_order() {
        let mut order = ShuffleOrder::random(3);
        order.remove_range(0, 3);
        assert!(order.is_empty());
    }

    #[test]
    fn move_entry_preserves_shuffle_identity() {
        // Shuffle order [2, 0, 3, 1]: child 0 is 2nd to play.
        let mut order = ShuffleOrder::from_indices(vec![2, 0, 3, 1]).unwrap();
        order.move_entry(2, 0);
        assert_valid(&order);
        // After the move child 2 lives at index 0, child 0 at 1, child 1 at 2.
        // Same children in the same shuffle positions, new numbering:
        assert_eq!(order.indices(), &[0, 1, 3, 2]);
        // Child formerly at raw index 0 (now 1) is still 2nd to play.
        assert_eq!(order.indices()[1], 1);
    }

    #[test]
    fn move_entry_forward() {
        let mut order = ShuffleOrder::from_indices(vec![0, 1, 2, 3]).unwrap();
        order.move_entry(0, 3);
        assert_valid(&order);
        assert_eq!(order.indices(), &[3, 0, 1, 2]);
    }

    #[test]
    fn move_entry_to_same_index_is_noop() {
        let mut order = ShuffleOrder::from_indices(vec![1, 2, 0]).unwrap();
        order.move_entry(1, 1);
        assert_eq!(order.indices(), &[1, 2, 0]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Command {
        Insert(usize),
        RemoveRange(usize, usize),
        Move(usize, usize),
    }

    fn command() -> impl Strategy<Value = Command> {
        prop_oneof![
            (0usize..64).prop_map(Command::Insert),
            (0usize..64, 0usize..64).prop_map(|(a, b)| Command::RemoveRange(a, b)),
            (0usize..64, 0usize..64).prop_map(|(a, b)| Command::Move(a, b)),
        ]
    }

    proptest! {
        /// Any sequence of clamped insert/remove/move commands keeps the
        /// order a dense permutation.
        #[test]
        fn mutations_keep_a_dense_permutation(
            initial in 0usize..12,
            commands in prop::collection::vec(command(), 0..32),
        ) {
            let mut order = ShuffleOrder::random(initial);
            for command in commands {
                let count = order.len();
                match command {
                    Command::Insert(at) => order.insert(at.min(count)),
                    Command::RemoveRange(a, b) => {
                        let start = a.min(count);
                        let end = b.min(count);
                        if start <= end {
                            order.remove_range(start, end);
                        }
                    }
                    Command::Move(from, to) => {
                        if count > 0 {
                            order.move_entry(from % count, to % count);
                        }
                    }
                }
                prop_assert!(is_permutation(order.indices()));
            }
        }
    }
}
