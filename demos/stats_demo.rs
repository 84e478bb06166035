use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use lin_hash::HashSet;
use lin_hash::HashTable;
use lin_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "values", default_value_t = 1000)]
    values: usize,

    /// Remove every other value after filling, to show that removal never
    /// shrinks the table.
    #[arg(short = 'r', long = "remove_half")]
    remove_half: bool,

    /// Print every bucket after filling.
    #[arg(short = 'd', long = "dump")]
    dump: bool,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    let mut table: HashTable<u64> = HashTable::new();
    println!(
        "Filling table with {} u64 values, starting from {} buckets...",
        args.values,
        table.bucket_count()
    );

    let mut splits = 0;
    for i in 0..args.values {
        let value = i as u64;
        let hash = hash_u64(value);

        let buckets_before = table.bucket_count();
        match table.entry(hash, |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
        splits += table.bucket_count() - buckets_before;
    }

    println!("Inserted {} values in {} splits", table.len(), splits);
    println!(
        "Split state: round {}, next bucket {}, {} buckets",
        table.split_round(),
        table.split_index(),
        table.bucket_count()
    );

    if args.remove_half {
        let buckets = table.bucket_count();
        for i in (0..args.values).step_by(2) {
            let value = i as u64;
            table.remove(hash_u64(value), |&v| v == value);
        }
        println!(
            "Removed every other value: {} left, bucket count {} -> {}",
            table.len(),
            buckets,
            table.bucket_count()
        );
    }

    println!("Bucket length histogram:");
    for (len, count) in table.occupancy_histogram().iter().enumerate() {
        if *count > 0 {
            println!("  {len:>3}: {count}");
        }
    }
    table.debug_stats().print();

    if args.dump {
        print!("{}", table.dump());
    }

    let set: HashSet<u64> = (0..args.values as u64).collect();
    let stats = set.debug_stats();
    println!(
        "HashSet with the default hasher: {} buckets, {:.2}% load factor",
        stats.bucket_count,
        stats.load_factor * 100.0
    );
}
