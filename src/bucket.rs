use alloc::vec::Vec;

/// An unordered run of `(hash, value)` slots.
///
/// The bucket tracks its own logical capacity instead of relying on the
/// growth policy of `Vec`: it starts at `N` slots and grows by exactly `N`
/// whenever an add finds it full. A bucket reporting "full before add" is the
/// overflow signal the table uses to schedule a split.
pub(crate) struct Bucket<V, const N: usize> {
    slots: Vec<(u64, V)>,
    capacity: usize,
}

impl<V, const N: usize> Bucket<V, N> {
    #[inline]
    pub(crate) fn new() -> Self {
        const { assert!(N > 0, "bucket width must be non-zero") };

        Self {
            slots: Vec::with_capacity(N),
            capacity: N,
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub(crate) fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Appends a value without checking for duplicates.
    ///
    /// Returns `true` if the bucket was already full before this add.
    pub(crate) fn add(&mut self, hash: u64, value: V) -> bool {
        let overflowed = self.is_full();
        if overflowed {
            // Allocation failure here is fatal; `reserve_exact` routes it through
            // `handle_alloc_error`.
            self.slots.reserve_exact(N);
            self.capacity += N;
        }

        self.slots.push((hash, value));
        debug_assert!(self.slots.len() <= self.capacity);

        overflowed
    }

    /// Returns the slot holding a value matching `hash` and `eq`.
    #[inline]
    pub(crate) fn position(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|(slot_hash, value)| *slot_hash == hash && eq(value))
    }

    #[inline(always)]
    pub(crate) fn get(&self, slot: usize) -> Option<&V> {
        self.slots.get(slot).map(|(_, value)| value)
    }

    /// # Panics
    ///
    /// Panics if `slot` is not occupied.
    #[inline(always)]
    pub(crate) fn value(&self, slot: usize) -> &V {
        &self.slots[slot].1
    }

    /// # Panics
    ///
    /// Panics if `slot` is not occupied.
    #[inline(always)]
    pub(crate) fn value_mut(&mut self, slot: usize) -> &mut V {
        &mut self.slots[slot].1
    }

    /// Removes the value at `slot`, moving the last occupied slot into its
    /// place. Capacity is not reclaimed.
    #[inline]
    pub(crate) fn swap_remove(&mut self, slot: usize) -> V {
        self.slots.swap_remove(slot).1
    }

    /// Keeps only the values for which `f` returns `true`. Returns the number
    /// of values removed.
    pub(crate) fn retain(&mut self, mut f: impl FnMut(&V) -> bool) -> usize {
        let before = self.slots.len();
        self.slots.retain(|(_, value)| f(value));
        before - self.slots.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.slots.iter().map(|(_, value)| value)
    }

    pub(crate) fn into_slots(self) -> Vec<(u64, V)> {
        self.slots
    }

    #[cfg(test)]
    pub(crate) fn slots_for_test(&self) -> &[(u64, V)] {
        &self.slots
    }
}

impl<V, const N: usize> Default for Bucket<V, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, const N: usize> Clone for Bucket<V, N>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        let mut slots = Vec::with_capacity(self.capacity);
        slots.extend(self.slots.iter().cloned());

        Self {
            slots,
            capacity: self.capacity,
        }
    }
}
