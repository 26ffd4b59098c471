//! # Cache Module
//!
//! Small in-memory caches shared by the bot.
//!
//! [`LRUCache`] keeps a bounded number of entries and drops the least
//! recently used one when full. The Lavalink client uses it to remember
//! the node's own track payloads between `search` and `play`:
//!
//! ```rust
//! use lavaqueue::cache::LRUCache;
//!
//! let cache = LRUCache::new(2);
//! cache.insert("a", 1);
//! cache.insert("b", 2);
//! cache.insert("c", 3);
//! assert!(cache.get(&"a").is_none());
//! ```

pub mod lru_cache;

pub use lru_cache::LRUCache;
