use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::hash_table::Cursor;
use crate::hash_table::DEFAULT_BUCKET_WIDTH;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;

/// A hash set implemented using the linear-hashing `HashTable` as the
/// underlying storage.
///
/// `HashSet<T, S, N>` stores values of type `T` where `T` implements
/// `Hash + Eq`, uses a configurable hasher builder `S` to hash values, and
/// keeps values in buckets of nominal width `N`.
///
/// The set starts with two buckets and grows by one bucket each time an
/// insert finds its target bucket full. Removing values never shrinks the
/// table.
///
/// # Equality
///
/// `==` compares contents only. [`structurally_eq`](HashSet::structurally_eq)
/// additionally requires both sets to be in the same split state, which
/// depends on the history of inserts and removals, not just on the contents.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder, const N: usize = DEFAULT_BUCKET_WIDTH> {
    table: HashTable<T, N>,
    hash_builder: S,
}

impl<T, S, const N: usize> PartialEq for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, const N: usize> Eq for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S, const N: usize> Debug for HashSet<T, S, N>
where
    T: Debug + Hash + Eq,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, const N: usize> HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use lin_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new hash set that can hold at least `capacity` elements
    /// without growing, using the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use lin_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_capacity_and_hasher(100, RandomState::new());
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// set.insert(1);
    /// assert!(!set.is_empty());
    /// # }
    /// ```
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots allocated across all buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of allocated buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Returns the number of completed doublings of the address space.
    pub fn split_round(&self) -> u32 {
        self.table.split_round()
    }

    /// Returns the index of the bucket the next split will redistribute.
    pub fn split_index(&self) -> usize {
        self.table.split_index()
    }

    /// Removes all elements from the set and returns it to its initial
    /// two-bucket shape.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert!(!set.is_empty());
    /// set.clear();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Splits buckets ahead of time so that at least `additional` more
    /// elements fit without exceeding the bucket width on average.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. That is:
    ///
    /// - If the set did not previously contain this value, `true` is returned.
    /// - If the set already contained this value, `false` is returned and the
    ///   set is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| v == &value) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Adds a value to the set and returns a cursor at its location together
    /// with whether it was newly inserted.
    ///
    /// If the value was already present, the cursor points at the stored
    /// value. If the insert caused a split, the cursor points at the value's
    /// post-split location.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<&str> = HashSet::new();
    /// let (cursor, inserted) = set.insert_full("a");
    /// assert!(inserted);
    /// assert_eq!(cursor.get(), Some(&"a"));
    ///
    /// let (_, inserted) = set.insert_full("a");
    /// assert!(!inserted);
    /// # }
    /// ```
    pub fn insert_full(&mut self, value: T) -> (Cursor<'_, T, N>, bool) {
        let hash = self.hash_builder.hash_one(&value);
        if let Some(pos) = self.table.position(hash, |v| v == &value) {
            return (self.table.cursor_at(pos), false);
        }

        let pos = self.table.insert_unique(hash, value);
        (self.table.cursor_at(pos), true)
    }

    /// Returns `true` if the set contains a value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&2));
    /// # }
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value).is_some()
    }

    /// Returns the number of stored values equal to `value`: `1` or `0`.
    pub fn count(&self, value: &T) -> usize {
        usize::from(self.contains(value))
    }

    /// Returns a cursor at the stored value equal to `value`, or the end
    /// cursor if there is none.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let set: HashSet<i32> = [1, 2, 3].into();
    /// assert_eq!(set.find(&2).get(), Some(&2));
    /// assert_eq!(set.find(&4), set.cursor_end());
    /// # }
    /// ```
    pub fn find(&self, value: &T) -> Cursor<'_, T, N> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find_cursor(hash, |v| v == value)
    }

    /// Returns a cursor at the first value in iteration order.
    pub fn cursor_front(&self) -> Cursor<'_, T, N> {
        self.table.cursor_front()
    }

    /// Returns the end cursor.
    pub fn cursor_end(&self) -> Cursor<'_, T, N> {
        self.table.cursor_end()
    }

    /// Removes a value from the set. Returns whether the value was
    /// present in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.remove(&1), true);
    /// assert_eq!(set.remove(&1), false);
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) -> bool {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v == value).is_some()
    }

    /// Removes a value from the set and returns the number of values
    /// removed: `1` or `0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = [7].into();
    /// assert_eq!(set.erase(&7), 1);
    /// assert_eq!(set.erase(&7), 0);
    /// # }
    /// ```
    pub fn erase(&mut self, value: &T) -> usize {
        usize::from(self.remove(value))
    }

    /// Adds a value to the set, replacing the existing value, if any, that is
    /// equal to the given one. Returns the replaced value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.replace(1), Some(1));
    /// assert_eq!(set.replace(2), None);
    /// assert_eq!(set.len(), 2);
    /// # }
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self.table.entry(hash, |v| v == &value) {
            Entry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Removes and returns the value in the set, if any, that is equal to the
    /// given one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.take(&1), Some(1));
    /// assert_eq!(set.take(&1), None);
    /// # }
    /// ```
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v == value)
    }

    /// Returns a reference to the value in the set, if any, that is equal to
    /// the given value.
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value)
    }

    /// Returns an iterator over the values of the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// for value in set.iter() {
    ///     println!("Value: {}", value);
    /// }
    /// assert_eq!(set.iter().len(), 2);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields all values from the
    /// set.
    ///
    /// After calling `drain()`, the set will be empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let values: Vec<_> = set.drain().collect();
    /// assert!(set.is_empty());
    /// assert_eq!(values.len(), 2);
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T, N> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// # }
    /// ```
    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.table.retain(f);
    }

    /// Returns `true` if both sets hold the same values *and* are in the same
    /// split state: same split round, split cursor, bucket count and length.
    ///
    /// Two sets with equal contents built through different histories of
    /// inserts and removals can differ structurally.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::DefaultHashBuilder;
    /// use lin_hash::HashSet;
    ///
    /// let a = HashSet::<u32, DefaultHashBuilder, 2>::new();
    /// let mut b = a.clone();
    /// for v in 0..100 {
    ///     b.insert(v);
    /// }
    /// for v in 0..100 {
    ///     b.remove(&v);
    /// }
    ///
    /// assert_eq!(a, b);
    /// assert!(!a.structurally_eq(&b));
    /// # }
    /// ```
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.table.same_shape(&other.table) && self.iter().all(|v| other.contains(v))
    }

    /// Returns a value that formats the split state and every bucket.
    ///
    /// See [`HashTable::dump`].
    pub fn dump(&self) -> crate::hash_table::Dump<'_, T, N>
    where
        T: Debug,
    {
        self.table.dump()
    }

    /// Returns occupancy and split statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }
}

impl<T, S, const N: usize> HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// assert_eq!(set.bucket_count(), 2);
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set with the specified capacity using the default
    /// hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use lin_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S, const N: usize> Default for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T, const N: usize = DEFAULT_BUCKET_WIDTH> {
    inner: crate::hash_table::Iter<'a, T, N>,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, const N: usize> core::iter::FusedIterator for Iter<'_, T, N> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, const N: usize = DEFAULT_BUCKET_WIDTH> {
    inner: crate::hash_table::Drain<'a, T, N>,
}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T, const N: usize = DEFAULT_BUCKET_WIDTH> {
    inner: crate::hash_table::IntoIter<T, N>,
}

impl<T, const N: usize> Iterator for Drain<'_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const N: usize> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const N: usize> ExactSizeIterator for Drain<'_, T, N> {}

impl<T, const N: usize> core::iter::FusedIterator for Drain<'_, T, N> {}

impl<T, const N: usize> ExactSizeIterator for IntoIter<T, N> {}

impl<T, const N: usize> core::iter::FusedIterator for IntoIter<T, N> {}

impl<T, S, const N: usize> IntoIterator for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = IntoIter<T, N>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, const N: usize> IntoIterator for &'a HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type IntoIter = Iter<'a, T, N>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, const N: usize> FromIterator<T> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl<T, S, const N: usize, const M: usize> From<[T; M]> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from(values: [T; M]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, S, const N: usize> Extend<T> for HashSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, const N: usize> Extend<&'a T> for HashSet<T, S, N>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(*value);
        }
    }
}
