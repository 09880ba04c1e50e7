//! Smooth weighted round robin.
//!
//! Each draw adds every item's weight to its running score, picks the
//! highest score and subtracts the total weight from the winner. Over any
//! window of `total` draws each item is picked exactly `weight` times, and
//! picks are interleaved rather than bunched.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Named item with a positive weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedItem {
    /// Item name
    pub name: String,
    /// Relative weight
    pub weight: u32,
}

impl WeightedItem {
    /// Create an item
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

#[derive(Debug)]
struct Slot {
    item: WeightedItem,
    current: i64,
}

/// Smooth weighted round robin sequencer
#[derive(Debug, Default)]
pub struct SmoothWeightedRoundRobin {
    slots: Vec<Slot>,
    total: i64,
}

impl SmoothWeightedRoundRobin {
    /// Create a sequencer over `items`
    #[must_use]
    pub fn new(items: &[WeightedItem]) -> Self {
        let mut swrr = Self::default();
        swrr.replace(items);
        swrr
    }

    /// Replace the item set and reset all running scores
    pub fn replace(&mut self, items: &[WeightedItem]) {
        self.slots = items
            .iter()
            .map(|item| Slot {
                item: item.clone(),
                current: 0,
            })
            .collect();
        self.total = items.iter().map(|item| i64::from(item.weight)).sum();
    }

    /// Whether any item is present
    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Whether the sequencer holds exactly `items`, in order
    #[must_use]
    pub fn holds(&self, items: &[WeightedItem]) -> bool {
        self.slots.len() == items.len()
            && self.slots.iter().zip(items).all(|(slot, item)| &slot.item == item)
    }

    /// Draw the next item; the first item wins ties
    pub fn next(&mut self) -> Option<&WeightedItem> {
        for slot in &mut self.slots {
            slot.current += i64::from(slot.item.weight);
        }

        let mut best: Option<usize> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if best.map_or(true, |b| slot.current > self.slots[b].current) {
                best = Some(index);
            }
        }

        let slot = &mut self.slots[best?];
        slot.current -= self.total;
        Some(&slot.item)
    }
}

/// Sequencers keyed by `client:group`, shared by every routing call
///
/// Each sequencer sits behind its own mutex so draws for different groups
/// never contend. When a call arrives with a different item list than the
/// sequencer holds (a branch appeared, vanished or changed weight), the
/// sequencer is reset to the new list.
#[derive(Debug, Default)]
pub struct SwrrRegistry {
    sequencers: DashMap<String, Arc<Mutex<SmoothWeightedRoundRobin>>>,
}

impl SwrrRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw from the sequencer under `key`, creating or resetting it to `items`
    ///
    /// Returns the drawn item's name, or `None` when `items` is empty.
    pub fn next(&self, key: &str, items: &[WeightedItem]) -> Option<String> {
        if items.is_empty() {
            return None;
        }

        // Clone the handle so the map shard is released before locking.
        let sequencer = Arc::clone(
            self.sequencers
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SmoothWeightedRoundRobin::default())))
                .value(),
        );

        let mut sequencer = sequencer.lock();
        if !sequencer.holds(items) {
            debug!(key = %key, items = items.len(), "Resetting weighted sequencer");
            sequencer.replace(items);
        }
        sequencer.next().map(|item| item.name.clone())
    }

    /// Number of live sequencers
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequencers.len()
    }

    /// Whether no sequencer exists yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequencers.is_empty()
    }

    /// Drop every sequencer
    pub fn clear(&self) {
        self.sequencers.clear();
    }
}
