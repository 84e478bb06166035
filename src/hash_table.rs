use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::bucket::Bucket;

/// Number of values a bucket holds before an add into it schedules a split.
pub const DEFAULT_BUCKET_WIDTH: usize = 5;

/// A fresh table starts in round one, with two buckets.
const INITIAL_SPLIT_ROUND: u32 = 1;

/// Reduces `hash` modulo `2^bits`. `bits` must be in `1..=64`.
#[inline(always)]
fn low_bits(hash: u64, bits: u32) -> usize {
    debug_assert!((1..=64).contains(&bits));
    (hash & (u64::MAX >> (64 - bits))) as usize
}

/// Split-state counters and the addressing functions derived from them.
///
/// `round` is the number of completed doublings of the address space and
/// `next` is the bucket scheduled for the next split. Buckets below `next`
/// have already been split this round and are addressed with one more hash
/// bit than the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SplitState {
    round: u32,
    next: usize,
}

impl SplitState {
    const fn new() -> Self {
        Self {
            round: INITIAL_SPLIT_ROUND,
            next: 0,
        }
    }

    /// `2^round`.
    #[inline(always)]
    fn round_width(self) -> usize {
        1usize << self.round
    }

    /// Number of buckets the addressing functions can reach.
    #[inline(always)]
    fn bucket_count(self) -> usize {
        self.round_width() + self.next
    }

    /// `h(hash) = hash mod 2^round`.
    #[inline(always)]
    fn current_round_index(self, hash: u64) -> usize {
        low_bits(hash, self.round)
    }

    /// `g(hash) = hash mod 2^(round + 1)`.
    #[inline(always)]
    fn next_round_index(self, hash: u64) -> usize {
        low_bits(hash, self.round + 1)
    }

    #[inline(always)]
    fn bucket_at(self, hash: u64) -> usize {
        let index = self.current_round_index(hash);
        if index < self.next {
            // Already split this round: the extra bit picks between the old
            // bucket and its image at `index + 2^round`.
            self.next_round_index(hash)
        } else {
            index
        }
    }

    fn advance(&mut self) {
        self.next += 1;
        if self.next == self.round_width() {
            self.next = 0;
            self.round += 1;
        }
    }

    #[inline(always)]
    fn is_consistent(self, bucket_count: usize) -> bool {
        self.next <= self.round_width()
            && self.round_width() <= bucket_count
            && self.bucket_count() == bucket_count
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Position {
    bucket: usize,
    slot: usize,
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of allocated buckets
    pub bucket_count: usize,
    /// Completed doublings of the address space
    pub split_round: u32,
    /// Index of the next bucket to split
    pub split_index: usize,
    /// Slots allocated across all buckets
    pub total_slots: usize,
    /// Buckets holding no values
    pub empty_buckets: usize,
    /// Buckets that have grown past the bucket width
    pub overflowed_buckets: usize,
    /// Length of the longest bucket
    pub max_bucket_len: usize,
    /// Load factor (populated / (bucket_count * bucket width))
    pub load_factor: f64,
    /// Slot utilization (populated / total_slots)
    pub slot_utilization: f64,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Linear Hash Table Debug Statistics ===");
        println!(
            "Population: {} in {} buckets ({:.2}% load factor)",
            self.populated,
            self.bucket_count,
            self.load_factor * 100.0
        );
        println!(
            "Split state: round {}, next bucket {}",
            self.split_round, self.split_index
        );
        println!(
            "Slot Usage: {}/{} ({:.2}% utilization)",
            self.populated,
            self.total_slots,
            self.slot_utilization * 100.0
        );
        println!(
            "Buckets: {} empty, {} overflowed, longest holds {}",
            self.empty_buckets, self.overflowed_buckets, self.max_bucket_len
        );
    }
}

/// A hash table using linear hashing.
///
/// `HashTable<V, N>` stores values of type `V` in buckets of nominal width
/// `N`. Like a raw table, it requires you to provide the hash value and an
/// equality predicate for each operation.
///
/// The table grows one bucket at a time. Whenever an insert lands in a bucket
/// that is already full, the bucket at the split cursor (which is not
/// necessarily the full one) is split: one bucket is appended and the
/// cursor bucket's values are redistributed between it and the new bucket
/// using one more bit of their hash. Every bucket gets split once per round in
/// cursor order, so no bucket can stay overloaded indefinitely.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use lin_hash::hash_table::Entry;
/// # use lin_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table: HashTable<Person> = HashTable::new();
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
#[derive(Clone)]
pub struct HashTable<V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    buckets: Vec<Bucket<V, N>>,
    state: SplitState,
    populated: usize,
}

impl<V, const N: usize> Debug for HashTable<V, N>
where
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("split_round", &self.state.round)
            .field("split_index", &self.state.next)
            .field("bucket_count", &self.buckets.len())
            .field("populated", &self.populated)
            .field(
                "buckets",
                &self
                    .buckets
                    .iter()
                    .map(|b| b.values().collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<V, const N: usize> Default for HashTable<V, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, const N: usize> HashTable<V, N> {
    /// Creates an empty table with two buckets in split round one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.split_round(), 1);
    /// assert_eq!(table.bucket_count(), 2);
    /// ```
    pub fn new() -> Self {
        let state = SplitState::new();
        let mut buckets = Vec::with_capacity(state.bucket_count());
        buckets.resize_with(state.bucket_count(), Bucket::new);

        Self {
            buckets,
            state,
            populated: 0,
        }
    }

    /// Creates a table with enough buckets for `capacity` values without
    /// exceeding the bucket width on average.
    ///
    /// Individual buckets can still overflow and trigger splits when hashes
    /// cluster.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.reserve(capacity);
        table
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the total number of slots allocated across all buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.iter().map(Bucket::capacity).sum()
    }

    /// Returns the number of allocated buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of completed doublings of the address space.
    pub fn split_round(&self) -> u32 {
        self.state.round
    }

    /// Returns the index of the bucket that the next split will redistribute.
    pub fn split_index(&self) -> usize {
        self.state.next
    }

    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        self.state == other.state
            && self.buckets.len() == other.buckets.len()
            && self.populated == other.populated
    }

    #[inline]
    pub(crate) fn position(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<Position> {
        let bucket = self.state.bucket_at(hash);
        let slot = self.buckets[bucket].position(hash, eq)?;
        Some(Position { bucket, slot })
    }

    #[inline(always)]
    fn value(&self, pos: Position) -> &V {
        self.buckets[pos.bucket].value(pos.slot)
    }

    #[inline(always)]
    fn value_mut(&mut self, pos: Position) -> &mut V {
        self.buckets[pos.bucket].value_mut(pos.slot)
    }

    /// Finds a value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.entry(42, |&v| v == 7).or_insert(7);
    ///
    /// assert_eq!(table.find(42, |&v| v == 7), Some(&7));
    /// assert_eq!(table.find(42, |&v| v == 8), None);
    /// assert_eq!(table.find(43, |&v| v == 7), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let pos = self.position(hash, eq)?;
        Some(self.value(pos))
    }

    /// Finds a value matching `hash` and `eq`, returning a mutable reference.
    ///
    /// The value must not be modified in a way that changes its hash.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let pos = self.position(hash, eq)?;
        Some(self.value_mut(pos))
    }

    /// Returns a cursor at the value matching `hash` and `eq`, or the end
    /// cursor if there is none.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.entry(3, |&v| v == 3).or_insert(3);
    ///
    /// assert_eq!(table.find_cursor(3, |&v| v == 3).get(), Some(&3));
    /// assert_eq!(table.find_cursor(4, |&v| v == 4), table.cursor_end());
    /// ```
    pub fn find_cursor(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Cursor<'_, V, N> {
        match self.position(hash, eq) {
            Some(pos) => self.cursor_at(pos),
            None => self.cursor_end(),
        }
    }

    /// Gets the entry for the value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::Entry;
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u64, &str)> = HashTable::new();
    ///
    /// match table.entry(1, |&(k, _)| k == 1) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((1, "one"));
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// assert!(matches!(
    ///     table.entry(1, |&(k, _)| k == 1),
    ///     Entry::Occupied(_)
    /// ));
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V, N> {
        match self.position(hash, eq) {
            Some(pos) => Entry::Occupied(OccupiedEntry { table: self, pos }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Removes the value matching `hash` and `eq` and returns it.
    ///
    /// The last value of the owning bucket takes its slot. Buckets never
    /// shrink and the table never merges buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.entry(5, |&v| v == 5).or_insert(5);
    ///
    /// assert_eq!(table.remove(5, |&v| v == 5), Some(5));
    /// assert_eq!(table.remove(5, |&v| v == 5), None);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let pos = self.position(hash, eq)?;
        Some(self.remove_at(pos))
    }

    fn remove_at(&mut self, pos: Position) -> V {
        self.populated -= 1;
        self.buckets[pos.bucket].swap_remove(pos.slot)
    }

    /// Inserts a value known not to be present, splitting the cursor bucket
    /// if the target bucket was already full. Returns where the value ended
    /// up once any split has finished.
    pub(crate) fn insert_unique(&mut self, hash: u64, value: V) -> Position {
        let bucket = self.state.bucket_at(hash);
        let slot = self.buckets[bucket].len();
        let overflowed = self.buckets[bucket].add(hash, value);
        self.populated += 1;

        if overflowed {
            let follow = (bucket == self.state.next).then_some(slot);
            if let Some(moved) = self.split(follow) {
                return moved;
            }
        }

        Position { bucket, slot }
    }

    /// Stores a value in the bucket its hash addresses without checking for
    /// overflow.
    fn place(&mut self, hash: u64, value: V) -> Position {
        let bucket = self.state.bucket_at(hash);
        let slot = self.buckets[bucket].len();
        self.buckets[bucket].add(hash, value);
        self.populated += 1;

        Position { bucket, slot }
    }

    /// Splits the bucket at the split cursor.
    ///
    /// Appends the image bucket, detaches the cursor bucket, advances the
    /// cursor, and re-places every detached value. Each value lands either
    /// back in the detached bucket's index or in the image bucket, depending
    /// on the hash bit the advanced state now consults.
    ///
    /// If `follow` names a slot of the detached bucket, returns that value's
    /// new position.
    fn split(&mut self, follow: Option<usize>) -> Option<Position> {
        debug_assert!(self.state.is_consistent(self.buckets.len()));

        let target = self.state.next;
        self.buckets.push(Bucket::new());

        let detached = core::mem::take(&mut self.buckets[target]);
        self.populated -= detached.len();
        self.state.advance();

        let mut followed = None;
        for (index, (hash, value)) in detached.into_slots().into_iter().enumerate() {
            let pos = self.place(hash, value);
            debug_assert!(pos.bucket == target || pos.bucket == self.buckets.len() - 1);
            if follow == Some(index) {
                followed = Some(pos);
            }
        }

        debug_assert!(self.state.is_consistent(self.buckets.len()));
        followed
    }

    /// Splits buckets until the table holds at least `additional` more values
    /// than it does now without exceeding the bucket width on average.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(1000);
    /// assert!(table.capacity() >= 1000);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.populated.saturating_add(additional);
        while self.buckets.len().saturating_mul(N) < needed {
            self.split(None);
        }
    }

    /// Retains only the values for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&V) -> bool) {
        for bucket in &mut self.buckets {
            self.populated -= bucket.retain(&mut f);
        }
    }

    /// Removes all elements and returns the table to its initial two-bucket
    /// shape.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64, 2> = HashTable::new();
    /// for v in 0..64 {
    ///     table.entry(v, |&x| x == v).or_insert(v);
    /// }
    /// assert!(table.bucket_count() > 2);
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.bucket_count(), 2);
    /// ```
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn cursor_at(&self, pos: Position) -> Cursor<'_, V, N> {
        debug_assert!(pos.slot < self.buckets[pos.bucket].len());
        Cursor {
            table: self,
            bucket: pos.bucket,
            slot: pos.slot,
        }
    }

    /// Returns a cursor at the first value, or the end cursor if the table is
    /// empty.
    pub fn cursor_front(&self) -> Cursor<'_, V, N> {
        Cursor::new(self, 0, 0)
    }

    /// Returns the cursor one past the last bucket.
    pub fn cursor_end(&self) -> Cursor<'_, V, N> {
        Cursor {
            table: self,
            bucket: self.buckets.len(),
            slot: 0,
        }
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values are yielded bucket by bucket; the order is otherwise
    /// unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// for v in 0..10 {
    ///     table.entry(v, |&x| x == v).or_insert(v);
    /// }
    ///
    /// let mut values: Vec<u64> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, (0..10).collect::<Vec<_>>());
    /// ```
    pub fn iter(&self) -> Iter<'_, V, N> {
        Iter {
            cursor: self.cursor_front(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table is reset to its initial shape as soon as this is called.
    pub fn drain(&mut self) -> Drain<'_, V, N> {
        Drain {
            inner: core::mem::take(self).into_iter(),
            _marker: PhantomData,
        }
    }

    /// Returns a value that formats the split state and every bucket, one
    /// bucket per line, marking the bucket at the split cursor with `->`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.entry(2, |&v| v == 2).or_insert(2);
    ///
    /// let dump = table.dump().to_string();
    /// assert!(dump.starts_with("split_round = 1, split_index = 0, bucket_count = 2, len = 1"));
    /// ```
    pub fn dump(&self) -> Dump<'_, V, N>
    where
        V: Debug,
    {
        Dump { table: self }
    }

    /// Returns a histogram of bucket lengths.
    ///
    /// Index `i` counts buckets holding `i` values, for `i` in `0..=2 * N`.
    /// The final bin counts every longer bucket.
    #[cfg(any(test, feature = "stats"))]
    pub fn occupancy_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 2 * N + 2];
        let last = hist.len() - 1;
        for bucket in &self.buckets {
            hist[bucket.len().min(last)] += 1;
        }
        hist
    }

    /// Returns occupancy and split statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let total_slots = self.capacity();
        let nominal_slots = self.buckets.len() * N;

        DebugStats {
            populated: self.populated,
            bucket_count: self.buckets.len(),
            split_round: self.state.round,
            split_index: self.state.next,
            total_slots,
            empty_buckets: self.buckets.iter().filter(|b| b.is_empty()).count(),
            overflowed_buckets: self.buckets.iter().filter(|b| b.capacity() > N).count(),
            max_bucket_len: self.buckets.iter().map(Bucket::len).max().unwrap_or(0),
            load_factor: if nominal_slots == 0 {
                0.0
            } else {
                self.populated as f64 / nominal_slots as f64
            },
            slot_utilization: if total_slots == 0 {
                0.0
            } else {
                self.populated as f64 / total_slots as f64
            },
        }
    }
}

/// Formats a table's split state and bucket contents.
///
/// Created by [`HashTable::dump`].
pub struct Dump<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    table: &'a HashTable<V, N>,
}

impl<V, const N: usize> fmt::Display for Dump<'_, V, N>
where
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table;
        writeln!(
            f,
            "split_round = {}, split_index = {}, bucket_count = {}, len = {}",
            table.state.round,
            table.state.next,
            table.buckets.len(),
            table.populated
        )?;

        for (index, bucket) in table.buckets.iter().enumerate() {
            let marker = if index == table.state.next { "->" } else { "  " };
            write!(
                f,
                "{marker} {index:>4} | ({:>3}/{:<3}) |",
                bucket.len(),
                bucket.capacity()
            )?;
            for value in bucket.values() {
                write!(f, " {value:?}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    /// A vacant entry - the value is not present in the table
    Vacant(VacantEntry<'a, V, N>),
    /// An occupied entry - the value is present in the table
    Occupied(OccupiedEntry<'a, V, N>),
}

impl<'a, V, const N: usize> Entry<'a, V, N> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u64, u32)> = HashTable::new();
    /// table.entry(9, |&(k, _)| k == 9).or_insert((9, 1)).1 += 1;
    /// table.entry(9, |&(k, _)| k == 9).or_insert((9, 1)).1 += 1;
    ///
    /// assert_eq!(table.find(9, |&(k, _)| k == 9), Some(&(9, 3)));
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    ///
    /// Returns the modified value, or `None` for a vacant entry.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(&mut *value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    table: &'a mut HashTable<V, N>,
    hash: u64,
}

impl<'a, V, const N: usize> VacantEntry<'a, V, N> {
    /// Inserts `value` and returns a mutable reference to it.
    ///
    /// The insert may split a bucket, in which case the returned reference
    /// points at the value's post-split location.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let pos = table.insert_unique(self.hash, value);
        table.value_mut(pos)
    }
}

/// An occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    table: &'a mut HashTable<V, N>,
    pos: Position,
}

impl<'a, V, const N: usize> OccupiedEntry<'a, V, N> {
    /// Returns a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.table.value(self.pos)
    }

    /// Returns a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.value_mut(self.pos)
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        self.table.value_mut(self.pos)
    }

    /// Removes the value from the table and returns it.
    pub fn remove(self) -> V {
        self.table.remove_at(self.pos)
    }
}

/// A forward position in a [`HashTable`].
///
/// A cursor is a `(bucket, slot)` pair. It never rests on an empty bucket:
/// construction and [`move_next`](Cursor::move_next) skip forward to the
/// next occupied slot, or to the end cursor one past the last bucket. Two
/// cursors are equal when they point into the same table at the same bucket
/// and slot.
///
/// The cursor borrows the table, so the table cannot be modified while it is
/// alive.
pub struct Cursor<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    table: &'a HashTable<V, N>,
    bucket: usize,
    slot: usize,
}

impl<'a, V, const N: usize> Cursor<'a, V, N> {
    fn new(table: &'a HashTable<V, N>, bucket: usize, slot: usize) -> Self {
        let mut cursor = Self {
            table,
            bucket,
            slot,
        };
        cursor.skip_exhausted();
        cursor
    }

    fn skip_exhausted(&mut self) {
        let buckets = &self.table.buckets;
        while self.bucket < buckets.len() && self.slot >= buckets[self.bucket].len() {
            self.bucket += 1;
            self.slot = 0;
        }
    }

    /// Returns the value under the cursor, or `None` at the end.
    pub fn get(&self) -> Option<&'a V> {
        let table = self.table;
        table.buckets.get(self.bucket)?.get(self.slot)
    }

    /// Returns `true` if the cursor is past the last value.
    pub fn is_end(&self) -> bool {
        self.bucket >= self.table.buckets.len()
    }

    /// Advances to the next value. Does nothing at the end.
    pub fn move_next(&mut self) {
        if self.is_end() {
            return;
        }
        self.slot += 1;
        self.skip_exhausted();
    }

    /// Number of values from the cursor (inclusive) to the end.
    fn remaining(&self) -> usize {
        let buckets = &self.table.buckets;
        if self.is_end() {
            return 0;
        }

        buckets[self.bucket].len() - self.slot
            + buckets[self.bucket + 1..]
                .iter()
                .map(Bucket::len)
                .sum::<usize>()
    }
}

impl<V, const N: usize> Clone for Cursor<'_, V, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, const N: usize> Copy for Cursor<'_, V, N> {}

impl<V, const N: usize> PartialEq for Cursor<'_, V, N> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.table, other.table)
            && self.bucket == other.bucket
            && self.slot == other.slot
    }
}

impl<V, const N: usize> Eq for Cursor<'_, V, N> {}

impl<V, const N: usize> Debug for Cursor<'_, V, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("bucket", &self.bucket)
            .field("slot", &self.slot)
            .finish()
    }
}

impl<'a, V, const N: usize> IntoIterator for Cursor<'a, V, N> {
    type IntoIter = Iter<'a, V, N>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            remaining: self.remaining(),
            cursor: self,
        }
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`], or by
/// converting a [`Cursor`] into an iterator.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    cursor: Cursor<'a, V, N>,
    remaining: usize,
}

impl<'a, V, const N: usize> Iter<'a, V, N> {
    /// Returns a cursor at the next value this iterator will yield.
    pub fn cursor(&self) -> Cursor<'a, V, N> {
        self.cursor
    }
}

impl<V, const N: usize> Clone for Iter<'_, V, N> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, V, const N: usize> Iterator for Iter<'a, V, N> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.cursor.get()?;
        self.cursor.move_next();
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, const N: usize> ExactSizeIterator for Iter<'_, V, N> {}

impl<V, const N: usize> FusedIterator for Iter<'_, V, N> {}

impl<'a, V, const N: usize> IntoIterator for &'a HashTable<V, N> {
    type IntoIter = Iter<'a, V, N>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A consuming iterator over the values in a [`HashTable`].
pub struct IntoIter<V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    buckets: alloc::vec::IntoIter<Bucket<V, N>>,
    slots: alloc::vec::IntoIter<(u64, V)>,
    remaining: usize,
}

impl<V, const N: usize> Iterator for IntoIter<V, N> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, value)) = self.slots.next() {
                self.remaining -= 1;
                return Some(value);
            }
            self.slots = self.buckets.next()?.into_slots().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, const N: usize> ExactSizeIterator for IntoIter<V, N> {}

impl<V, const N: usize> FusedIterator for IntoIter<V, N> {}

impl<V, const N: usize> IntoIterator for HashTable<V, N> {
    type IntoIter = IntoIter<V, N>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.populated,
            buckets: self.buckets.into_iter(),
            slots: Vec::new().into_iter(),
        }
    }
}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// Values not yet yielded are dropped with the iterator.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V, const N: usize = DEFAULT_BUCKET_WIDTH> {
    inner: IntoIter<V, N>,
    _marker: PhantomData<&'a mut HashTable<V, N>>,
}

impl<V, const N: usize> Iterator for Drain<'_, V, N> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V, const N: usize> ExactSizeIterator for Drain<'_, V, N> {}

impl<V, const N: usize> FusedIterator for Drain<'_, V, N> {}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::Hasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    /// Inserts `key` using the key itself as its hash.
    fn insert_identity<const N: usize>(table: &mut HashTable<u64, N>, key: u64) -> bool {
        match table.entry(key, |&v| v == key) {
            Entry::Vacant(entry) => {
                entry.insert(key);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn bucket_contents<V: Clone + Ord, const N: usize>(table: &HashTable<V, N>) -> Vec<Vec<V>> {
        table
            .buckets
            .iter()
            .map(|b| {
                let mut values: Vec<V> = b.values().cloned().collect();
                values.sort();
                values
            })
            .collect()
    }

    /// Checks the split-state invariants and that every stored value sits in
    /// the bucket its hash addresses.
    fn assert_consistent<V: Debug, const N: usize>(table: &HashTable<V, N>) {
        let state = table.state;
        assert!(state.next <= state.round_width(), "{}", table.dump());
        assert!(state.round_width() <= table.buckets.len(), "{}", table.dump());
        assert_eq!(state.bucket_count(), table.buckets.len(), "{}", table.dump());

        let mut counted = 0;
        for (index, bucket) in table.buckets.iter().enumerate() {
            for (hash, _) in bucket.slots_for_test() {
                assert_eq!(state.bucket_at(*hash), index, "{}", table.dump());
            }
            counted += bucket.len();
        }
        assert_eq!(counted, table.populated);
    }

    #[test]
    fn split_state_addressing() {
        let mut state = SplitState::new();
        assert_eq!(state.bucket_count(), 2);
        assert_eq!(state.current_round_index(0b1011), 0b1);
        assert_eq!(state.next_round_index(0b1011), 0b11);
        assert_eq!(state.bucket_at(0b1010), 0);

        state.advance();
        assert_eq!((state.round, state.next), (1, 1));
        assert_eq!(state.bucket_at(0b1010), 0b10, "bucket 0 was split");
        assert_eq!(state.bucket_at(0b1000), 0);
        assert_eq!(state.bucket_at(0b1011), 1, "bucket 1 is not split yet");

        state.advance();
        assert_eq!((state.round, state.next), (2, 0));
        assert_eq!(state.bucket_count(), 4);
        assert_eq!(state.bucket_at(0b1011), 0b11);
    }

    #[test]
    fn split_state_handles_wide_rounds() {
        let state = SplitState { round: 63, next: 0 };
        assert_eq!(state.current_round_index(u64::MAX), (u64::MAX >> 1) as usize);
        assert_eq!(state.next_round_index(u64::MAX), u64::MAX as usize);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v: &Item| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item {
                        key: k,
                        value: (k as i32) * 2,
                    });
                    assert_eq!(
                        table.find(hash, |v| v.key == k),
                        Some(&Item {
                            key: k,
                            value: (k as i32) * 2
                        }),
                        "{:#?}",
                        table
                    );
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert: {:#?}", table),
            }
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
        assert_consistent(&table);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        match table.entry(hash, |v| v.key == k) {
            Entry::Vacant(v) => {
                v.insert(Item { key: k, value: 7 });
            }
            Entry::Occupied(_) => panic!("should be vacant first time"),
        }

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev_value = occ.get().value;
                *occ.get_mut() = Item { key: k, value: 11 };
                assert_eq!(prev_value, 7, "{:#?}", table);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        let found = table.find(hash, |v| v.key == k).unwrap();
        assert_eq!(found.value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item { key: k, value: 1 });
                }
                _ => unreachable!(),
            }
        }

        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            if let Some(v) = table.find_mut(hash, |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            let v = table.find(hash, |v| v.key == k).unwrap();
            assert_eq!(v.value, 10);
        }
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..8u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(Item {
                        key: k,
                        value: k as i32,
                    });
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(table.len(), 8);
        for k in [0u64, 3, 7] {
            let hash = hash_key(&state, k);
            let removed = table.remove(hash, |v| v.key == k).expect("should remove");
            assert_eq!(removed.key, k);
        }
        assert_eq!(table.len(), 5);

        let hash = hash_key(&state, 1000);
        assert!(table.remove(hash, |v| v.key == 1000).is_none());
        assert_consistent(&table);
    }

    #[test]
    fn occupied_entry_remove() {
        let mut table: HashTable<u64> = HashTable::new();
        insert_identity(&mut table, 4);
        insert_identity(&mut table, 6);

        match table.entry(4, |&v| v == 4) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), 4),
            Entry::Vacant(_) => panic!("4 was inserted"),
        }
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(6, |&v| v == 6), Some(&6));
    }

    #[test]
    fn entry_or_insert_with_and_default() {
        let mut table: HashTable<(u64, Vec<u32>)> = HashTable::new();
        table
            .entry(1, |(k, _)| *k == 1)
            .or_insert_with(|| (1, vec![]))
            .1
            .push(10);
        table
            .entry(1, |(k, _)| *k == 1)
            .or_insert_with(|| unreachable!())
            .1
            .push(11);

        assert_eq!(table.find(1, |(k, _)| *k == 1).unwrap().1, [10, 11]);

        let mut counts: HashTable<u32> = HashTable::new();
        *counts.entry(3, |_| true).or_default() += 1;
        assert_eq!(counts.find(3, |_| true), Some(&1));
    }

    #[test]
    fn entry_and_modify() {
        let mut table: HashTable<(u64, u32)> = HashTable::new();
        assert!(table.entry(2, |&(k, _)| k == 2).and_modify(|_| {}).is_none());

        table.entry(2, |&(k, _)| k == 2).or_insert((2, 0));
        let modified = table
            .entry(2, |&(k, _)| k == 2)
            .and_modify(|(_, v)| *v += 5)
            .copied();
        assert_eq!(modified, Some((2, 5)));
    }

    #[test]
    fn worked_example_layout() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..6 {
            assert!(insert_identity(&mut table, k));
        }

        assert_eq!(table.bucket_count(), 2, "{}", table.dump());
        assert_eq!(table.split_round(), 1);
        assert_eq!(table.split_index(), 0);
        assert_eq!(bucket_contents(&table), [vec![0, 2, 4], vec![1, 3, 5]]);

        assert!(insert_identity(&mut table, 6));
        assert_eq!(table.bucket_count(), 3, "{}", table.dump());
        assert_eq!(table.split_round(), 1);
        assert_eq!(table.split_index(), 1);
        assert_eq!(
            bucket_contents(&table),
            [vec![0, 4], vec![1, 3, 5], vec![2, 6]]
        );
        assert_eq!(table.len(), 7);
        assert_consistent(&table);
    }

    #[test]
    fn split_rolls_into_next_round() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..=7 {
            insert_identity(&mut table, k);
        }

        assert_eq!(table.split_round(), 2, "{}", table.dump());
        assert_eq!(table.split_index(), 0);
        assert_eq!(table.bucket_count(), 4);
        assert_eq!(
            bucket_contents(&table),
            [vec![0, 4], vec![1, 5], vec![2, 6], vec![3, 7]]
        );
        assert_consistent(&table);
    }

    #[test]
    fn overflow_splits_cursor_bucket_not_hot_bucket() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in [0, 1, 2, 3, 4, 5, 6, 7, 8, 12] {
            insert_identity(&mut table, k);
        }
        assert_eq!((table.split_round(), table.split_index()), (2, 1));
        assert_eq!(
            bucket_contents(&table),
            [vec![0, 8], vec![1, 5], vec![2, 6], vec![3, 7], vec![4, 12]]
        );

        insert_identity(&mut table, 11);
        insert_identity(&mut table, 15);

        // Bucket 3 overflowed, but bucket 1 sits at the cursor and is the one
        // that gets split.
        assert_eq!((table.split_round(), table.split_index()), (2, 2));
        assert_eq!(table.bucket_count(), 6);
        assert_eq!(
            bucket_contents(&table),
            [
                vec![0, 8],
                vec![1],
                vec![2, 6],
                vec![3, 7, 11, 15],
                vec![4, 12],
                vec![5]
            ]
        );
        assert_eq!(table.buckets[3].capacity(), 6);
        assert_consistent(&table);
    }

    #[test]
    fn split_relocates_by_next_round_hash() {
        let state = HashState::default();
        let mut table: HashTable<u64, 4> = HashTable::new();
        let mut rng = SmallRng::seed_from_u64(0x5eed);

        for _ in 0..2000 {
            let key = rng.random_range(0..100_000u64);
            let hash = hash_key(&state, key);
            if table.find(hash, |&v| v == key).is_some() {
                continue;
            }

            let before = table.state;
            let target: Vec<u64> = table.buckets[before.next]
                .slots_for_test()
                .iter()
                .map(|(h, _)| *h)
                .collect();
            let len = table.len();

            table.entry(hash, |&v| v == key).or_insert(key);
            assert_eq!(table.len(), len + 1);

            if table.bucket_count() > before.bucket_count() {
                // A split happened: every value of the split bucket now lives
                // where the previous round's `g` sends it.
                let image = before.bucket_count();
                for h in target {
                    let expected = before.next_round_index(h);
                    assert!(expected == before.next || expected == image);
                    assert!(
                        table.buckets[expected]
                            .slots_for_test()
                            .iter()
                            .any(|(sh, _)| *sh == h),
                        "{}",
                        table.dump()
                    );
                }
            }
        }

        assert_consistent(&table);
    }

    #[test]
    fn vacant_insert_follows_split() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..6 {
            insert_identity(&mut table, k);
        }

        let Entry::Vacant(entry) = table.entry(6, |&v| v == 6) else {
            panic!("6 is not present yet");
        };
        let value = entry.insert(6);
        assert_eq!(*value, 6);

        let cursor = table.find_cursor(6, |&v| v == 6);
        assert_eq!((cursor.bucket, cursor.slot), (2, 1));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            table.entry(hash, |v| v.key == k).or_insert(Item {
                key: k,
                value: k as i32,
            });
        }
        assert_eq!(table.len(), 100000);

        for k in 0..100000u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k).map(|v| v.value),
                Some(k as i32)
            );
        }

        let stats = table.debug_stats();
        assert!(stats.load_factor < 2.0, "{:?}", stats);
        assert_consistent(&table);
    }

    #[test]
    fn insert_remove_randomized() {
        let state = HashState::default();
        let mut table: HashTable<u64, 2> = HashTable::new();
        let mut oracle = hashbrown::HashSet::new();
        let mut rng = SmallRng::seed_from_u64(42);

        for _ in 0..20_000 {
            let key = rng.random_range(0..2_000u64);
            let hash = hash_key(&state, key);
            if rng.random_bool(0.6) {
                let inserted = match table.entry(hash, |&v| v == key) {
                    Entry::Vacant(entry) => {
                        entry.insert(key);
                        true
                    }
                    Entry::Occupied(_) => false,
                };
                assert_eq!(inserted, oracle.insert(key));
            } else {
                assert_eq!(
                    table.remove(hash, |&v| v == key).is_some(),
                    oracle.remove(&key)
                );
            }
            assert_eq!(table.len(), oracle.len());
        }

        for key in &oracle {
            let hash = hash_key(&state, *key);
            assert_eq!(table.find(hash, |v| v == key), Some(key));
        }
        assert_consistent(&table);
    }

    #[test]
    fn remove_never_merges_buckets() {
        let mut table: HashTable<u64, 2> = HashTable::new();
        for k in 0..64 {
            insert_identity(&mut table, k);
        }
        let buckets = table.bucket_count();
        let round = table.split_round();

        for k in 0..64 {
            assert_eq!(table.remove(k, |&v| v == k), Some(k));
        }
        assert!(table.is_empty());
        assert_eq!(table.bucket_count(), buckets);
        assert_eq!(table.split_round(), round);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn cursor_skips_empty_buckets() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        assert!(table.cursor_front().is_end());
        assert_eq!(table.cursor_front(), table.cursor_end());

        insert_identity(&mut table, 1);
        let mut cursor = table.cursor_front();
        assert_eq!((cursor.bucket, cursor.slot), (1, 0));
        assert_eq!(cursor.get(), Some(&1));

        cursor.move_next();
        assert!(cursor.is_end());
        assert_eq!(cursor.get(), None);
        assert_eq!(cursor, table.cursor_end());

        cursor.move_next();
        assert_eq!(cursor, table.cursor_end());
    }

    #[test]
    fn cursor_equality_requires_same_table() {
        let mut a: HashTable<u64> = HashTable::new();
        let mut b: HashTable<u64> = HashTable::new();
        insert_identity(&mut a, 0);
        insert_identity(&mut b, 0);

        assert_eq!(a.cursor_front(), a.find_cursor(0, |&v| v == 0));
        assert_ne!(a.cursor_front(), b.cursor_front());
        assert_ne!(a.cursor_end(), b.cursor_end());
    }

    #[test]
    fn cursor_into_iter_yields_rest() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..20 {
            insert_identity(&mut table, k);
        }

        let mut iter = table.iter();
        iter.nth(6);
        let rest = iter.cursor().into_iter();
        assert_eq!(rest.len(), 13);
        assert_eq!(rest.count(), 13);

        let from_end = table.cursor_end().into_iter();
        assert_eq!(from_end.len(), 0);
    }

    #[test]
    fn iter_yields_each_value_once() {
        let state = HashState::default();
        let mut table: HashTable<u64, 4> = HashTable::new();
        for k in 0..500u64 {
            table.entry(hash_key(&state, k), |&v| v == k).or_insert(k);
        }

        let iter = table.iter();
        assert_eq!(iter.len(), 500);
        let mut values: Vec<u64> = iter.copied().collect();
        values.sort_unstable();
        assert_eq!(values, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn drain_resets_table() {
        let mut table: HashTable<u64, 2> = HashTable::new();
        for k in 0..40 {
            insert_identity(&mut table, k);
        }

        let mut drained: Vec<u64> = table.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..40).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.bucket_count(), 2);

        insert_identity(&mut table, 3);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn into_iter_consumes_all() {
        let mut table: HashTable<alloc::string::String, 3> = HashTable::new();
        let state = HashState::default();
        for k in 0..30u64 {
            let s = k.to_string();
            table.entry(hash_key(&state, k), |v| *v == s).or_insert(s.clone());
        }

        let iter = table.into_iter();
        assert_eq!(iter.len(), 30);
        assert_eq!(iter.count(), 30);
    }

    #[test]
    fn retain_updates_len() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..30 {
            insert_identity(&mut table, k);
        }

        table.retain(|v| v % 3 == 0);
        assert_eq!(table.len(), 10);
        assert_eq!(table.iter().count(), 10);
        assert!(table.iter().all(|v| v % 3 == 0));
        assert_consistent(&table);
    }

    #[test]
    fn reserve_splits_ahead() {
        let mut table: HashTable<u64, 4> = HashTable::new();
        for k in 0..10 {
            insert_identity(&mut table, k);
        }

        table.reserve(100);
        assert!(table.bucket_count() * 4 >= 110, "{}", table.dump());
        assert_eq!(table.len(), 10);
        assert_consistent(&table);

        let with_capacity: HashTable<u64, 4> = HashTable::with_capacity(37);
        assert!(with_capacity.bucket_count() * 4 >= 37);
        assert!(with_capacity.capacity() >= 37);
    }

    #[test]
    fn with_capacity_still_splits_on_clustered_hashes() {
        let mut table: HashTable<u64> = HashTable::with_capacity(100);
        let reserved = table.bucket_count();
        assert!(reserved * DEFAULT_BUCKET_WIDTH >= 100);

        // Every hash shares its low ten bits, so one bucket takes them all.
        for k in 0..100u64 {
            assert!(insert_identity(&mut table, k * 1024));
        }

        assert_eq!(table.len(), 100);
        assert!(table.bucket_count() > reserved, "{}", table.dump());
        assert_consistent(&table);
    }

    #[test]
    fn clone_is_deep() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..12 {
            insert_identity(&mut table, k);
        }

        let mut copy = table.clone();
        assert!(copy.same_shape(&table));
        assert_eq!(bucket_contents(&copy), bucket_contents(&table));

        copy.remove(5, |&v| v == 5);
        insert_identity(&mut copy, 100);
        assert_eq!(table.find(5, |&v| v == 5), Some(&5));
        assert_eq!(table.find(100, |&v| v == 100), None);
    }

    #[test]
    fn dump_lists_every_bucket() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in 0..7 {
            insert_identity(&mut table, k);
        }

        let dump = table.dump().to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(
            lines[0],
            "split_round = 1, split_index = 1, bucket_count = 3, len = 7"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("->    1 |"), "{dump}");
        assert!(lines[3].ends_with("| 2 6"), "{dump}");
    }

    #[test]
    fn debug_stats_and_histogram() {
        let mut table: HashTable<u64, 3> = HashTable::new();
        for k in [0, 2, 4, 6] {
            insert_identity(&mut table, k);
        }

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 4);
        assert_eq!(stats.bucket_count, 3);
        assert_eq!(stats.split_index, 1);
        assert_eq!(stats.empty_buckets, 1);
        assert_eq!(stats.max_bucket_len, 2);

        let hist = table.occupancy_histogram();
        assert_eq!(hist.len(), 8);
        assert_eq!(hist[0], 1);
        assert_eq!(hist[2], 2);
        assert_eq!(hist.iter().sum::<usize>(), table.bucket_count());
    }
}
