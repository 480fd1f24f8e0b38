use crate::core::sequence::Sequence;
use std::cell::UnsafeCell;

/// Fixed-size, preallocated array of reusable event slots.
///
/// Slots are allocated once at construction and overwritten in place on each
/// wrap-around; nothing is allocated or freed on the hot path. Capacity is a
/// power of two, so the slot for a sequence is found with a mask instead of
/// a modulo and no bounds error is possible.
///
/// ### Concurrency contract
///
/// The store itself does no synchronization. A slot pointer is valid for
/// writing only between a successful claim and the matching publish of that
/// sequence, and valid for reading only between barrier-granted
/// availability and the reader's own advance of its consumed sequence. The
/// sequencer's cursor handoff (release store on publish, acquire load in
/// the barrier) is what makes a producer's slot write visible to readers.
pub(crate) struct SlotStore<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: usize,
}

// SAFETY: slots are plain memory; exclusive write access is enforced by the
// claim/publish protocol and shared reads only happen at or below the
// published cursor. T crosses threads (producer writes, processors read),
// and independent processors may read the same slot concurrently, hence the
// Send + Sync bounds on T.
unsafe impl<T: Send + Sync> Send for SlotStore<T> {}
unsafe impl<T: Send + Sync> Sync for SlotStore<T> {}

impl<T> SlotStore<T> {
    /// `capacity` must already be validated as a positive power of two.
    pub(crate) fn new(capacity: usize, mut factory: impl FnMut() -> T) -> Self {
        debug_assert!(capacity > 0 && capacity.is_power_of_two());

        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(UnsafeCell::new(factory()));
        }

        Self {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Raw pointer to the slot for `sequence`.
    ///
    /// # Safety
    /// The caller must hold the exclusive claim window (writes) or a
    /// barrier-granted availability at or above `sequence` (reads), per the
    /// concurrency contract above.
    #[inline]
    pub(crate) unsafe fn slot(&self, sequence: Sequence) -> *mut T {
        debug_assert!(sequence >= 0);
        self.slots[(sequence as usize) & self.mask].get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_mask_indexing() {
        let store = SlotStore::new(8, || 0u64);
        assert_eq!(store.capacity(), 8);

        // Sequences a capacity apart share a slot.
        unsafe {
            *store.slot(3) = 33;
            assert_eq!(*store.slot(3), 33);
            assert_eq!(store.slot(3), store.slot(11));
            assert_ne!(store.slot(3), store.slot(4));
        }
    }

    #[test]
    fn factory_runs_once_per_slot() {
        let mut built = 0;
        let store = SlotStore::new(4, || {
            built += 1;
            built
        });
        assert_eq!(built, 4);
        unsafe {
            assert_eq!(*store.slot(0), 1);
            assert_eq!(*store.slot(3), 4);
        }
    }
}
