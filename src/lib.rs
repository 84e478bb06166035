#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bucket;

pub mod hash_table;

/// A hash set implementation using linear hashing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Placeholder hasher builder for builds with neither `std` nor
        /// `foldhash`. It cannot be constructed, so a hasher must be supplied
        /// through [`HashSet::with_hasher`].
        pub enum DefaultHashBuilder {}
    }
}

pub use hash_set::HashSet;
pub use hash_table::Cursor;
pub use hash_table::DEFAULT_BUCKET_WIDTH;
pub use hash_table::HashTable;
