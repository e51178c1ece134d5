//! Ordered key-value store built on a skip list.
//!
//! Entries are kept in ascending key order across a stack of linked levels.
//! Level 0 links every entry; each higher level links a random subset of the
//! level below it, so lookups skip ahead in O(log n) expected steps.
//!
//! # Layout
//!
//! ```text
//! Arena (Slab)  - owns entries, hands out stable indices
//! SkipList      - header array + successor indices, no pointers
//! ```
//!
//! Entries never move once inserted. Links are `u32` indices by default; the
//! reserved value `u32::MAX` marks the end of a chain.
//!
//! # Quick Start
//!
//! ```
//! use nexus_skiplist::{InsertOutcome, SkipListBuilder};
//!
//! let mut list = SkipListBuilder::default()
//!     .max_level(6)
//!     .seed(42)
//!     .build::<i32, String>()?;
//!
//! assert_eq!(list.insert(5, "a".into()), InsertOutcome::Inserted);
//! assert_eq!(list.insert(1, "b".into()), InsertOutcome::Inserted);
//! assert_eq!(list.insert(5, "z".into()), InsertOutcome::AlreadyExists);
//!
//! assert!(list.contains_key(&1));
//! assert_eq!(list.get(&5), Some(&"a".into()));
//!
//! list.delete(&1);
//! assert_eq!(list.len(), 1);
//! # Ok::<(), nexus_skiplist::Error>(())
//! ```
//!
//! # Persistence
//!
//! A [`FlatFile`] stores the level-0 chain as `key:value;` lines. Loading
//! replays inserts, so the level structure is rebuilt from new draws.
//!
//! ```no_run
//! use nexus_skiplist::{FlatFile, SkipListBuilder};
//!
//! let mut list = SkipListBuilder::default().build::<i32, String>()?;
//! list.insert(1, "one".into());
//!
//! let file = FlatFile::default(); // ./dumpFile.txt
//! file.dump(&list)?;
//!
//! let mut restored = SkipListBuilder::default().build::<i32, String>()?;
//! let report = file.load(&mut restored)?;
//! assert_eq!(report.inserted, 1);
//! # Ok::<(), nexus_skiplist::Error>(())
//! ```
//!
//! # Threads
//!
//! [`SkipList`] takes `&mut self` for every mutation and has no interior
//! locking. Wrap it in a [`SharedSkipList`] (one mutex around the whole list)
//! to share it between threads.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber:
//!
//! | Level | Events |
//! |-------|--------|
//! | `trace` | every search, insert, and delete |
//! | `debug` | height changes, dump and load summaries, skipped lines |
//! | `warn` | records dropped because a key or value failed to decode |

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod index;
pub mod level;
pub mod persist;
pub mod skiplist;
pub mod storage;
pub mod sync;

pub use config::{DEFAULT_MAX_LEVEL, MAX_LEVEL_LIMIT, SkipListBuilder};
pub use error::{Error, Result};
pub use index::Index;
pub use level::{DEFAULT_LEVEL_RATIO, LevelOracle};
pub use persist::{
    Codec, DEFAULT_STORE_FILE, DecodeError, Decoded, DisplayCodec, FlatFile, FnCodec, LoadReport,
    Snapshot, read_records, write_records,
};
pub use skiplist::{InsertOutcome, Iter, LevelKeys, Levels, SkipList};
pub use storage::Arena;
pub use sync::SharedSkipList;
