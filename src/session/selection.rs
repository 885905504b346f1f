use std::collections::BTreeMap;

use indexmap::IndexSet;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::types::entry_data::EntrySet;

/// How the next card is picked within a cycle. Both policies only return
/// indices that are not yet in `already_shown`, so a cycle visits every entry
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    #[default]
    Uniform,
    PriorityWeighted,
}

impl SelectionPolicy {
    pub fn from_options(priority_aware: bool) -> Self {
        if priority_aware {
            SelectionPolicy::PriorityWeighted
        } else {
            SelectionPolicy::Uniform
        }
    }

    /// Returns `None` only when every usable entry is already shown (or the set
    /// is empty). The caller rolls the cycle before asking again.
    pub fn select_next<R: Rng + ?Sized>(
        self,
        entries: &EntrySet,
        already_shown: &IndexSet<usize>,
        current: Option<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        match self {
            SelectionPolicy::Uniform => select_uniform(entries, already_shown, current, rng),
            SelectionPolicy::PriorityWeighted => {
                select_by_priority(entries, already_shown, current, rng)
            }
        }
    }
}

fn select_uniform<R: Rng + ?Sized>(
    entries: &EntrySet,
    already_shown: &IndexSet<usize>,
    current: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    let eligible: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(index, entry)| !already_shown.contains(index) && entry.is_usable())
        .map(|(index, _)| index)
        .collect();

    // Right after a cycle roll the previous card is eligible again; avoid
    // showing it twice in a row unless it is the only one left.
    let fresh: Vec<usize> = eligible.iter().copied().filter(|&i| Some(i) != current).collect();
    let pool = if fresh.is_empty() { &eligible } else { &fresh };

    pool.choose(rng).copied()
}

fn select_by_priority<R: Rng + ?Sized>(
    entries: &EntrySet,
    already_shown: &IndexSet<usize>,
    current: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    let order = priority_order(entries, rng);

    order
        .iter()
        .copied()
        .find(|i| !already_shown.contains(i) && Some(*i) != current)
        .or_else(|| order.iter().copied().find(|i| !already_shown.contains(i)))
}

/// All usable indices, grouped by ascending priority, each group shuffled.
fn priority_order<R: Rng + ?Sized>(entries: &EntrySet, rng: &mut R) -> Vec<usize> {
    let mut buckets: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate().filter(|(_, e)| e.is_usable()) {
        buckets.entry(entry.priority()).or_default().push(index);
    }

    let mut order = Vec::with_capacity(entries.len());
    for (_, mut bucket) in buckets {
        bucket.shuffle(rng);
        order.extend(bucket);
    }
    order
}
