//! `Selector` interning for the `RuntimeKit` runtime.
//!
//! Each unique method name maps to exactly one interned record, so selectors
//! compare by pointer and hash with a value computed once at interning time.
//! A [`MethodCallRequest`](crate::runtime::dispatch::MethodCallRequest)
//! resolves its name here once and reuses the selector for every call.
//!
//! # Architecture
//!
//! Interned records are leaked on first use and live for the rest of the
//! process, which makes [`Selector`] a `Copy` pointer with `'static` data.
//! The registry is split into `NUM_SHARDS` independently locked maps keyed by
//! the low bits of the `FxHash` of the name, so concurrent interning of
//! unrelated names rarely contends on the same lock.

// SHARD_MASK is 15, the truncation to a shard index is intentional.
#![allow(clippy::cast_possible_truncation)]

use crate::error::{Error, Result};
use crate::runtime::{read_lock, write_lock};
use fxhash::{FxHashMap, FxHasher};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Number of shards in the selector registry (power of 2 for fast bit masking).
const NUM_SHARDS: usize = 16;

/// Bit mask for shard selection.
const SHARD_MASK: usize = NUM_SHARDS - 1;

/// Interned selector record. Never deallocated.
struct InternedSelector {
    name: &'static str,
    hash: u64,
}

struct SelectorRegistry {
    shards: [RwLock<FxHashMap<&'static str, &'static InternedSelector>>; NUM_SHARDS],
}

static REGISTRY: OnceLock<SelectorRegistry> = OnceLock::new();

fn registry() -> &'static SelectorRegistry {
    REGISTRY.get_or_init(|| SelectorRegistry {
        shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
    })
}

fn hash_name(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

/// A unique, interned method name.
///
/// # Example
///
/// ```rust
/// use runtimekit::Selector;
/// use std::str::FromStr;
///
/// let sel1 = Selector::from_str("greet:").unwrap();
/// let sel2 = Selector::from_str("greet:").unwrap();
///
/// assert_eq!(sel1, sel2);
/// assert_eq!(sel1.name(), "greet:");
/// ```
#[derive(Clone, Copy)]
pub struct Selector {
    interned: &'static InternedSelector,
}

impl FromStr for Selector {
    type Err = Error;

    /// Returns the selector for `name`, interning it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if `name` is empty or contains
    /// whitespace.
    fn from_str(name: &str) -> Result<Self> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSelector);
        }

        let hash = hash_name(name);
        let shard = &registry().shards[(hash as usize) & SHARD_MASK];

        // Fast path: read lock only
        if let Some(interned) = read_lock(shard).get(name) {
            return Ok(Selector { interned });
        }

        let mut entries = write_lock(shard);

        // Another thread may have interned it while we waited for the write lock
        if let Some(interned) = entries.get(name) {
            return Ok(Selector { interned });
        }

        let name: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let interned: &'static InternedSelector =
            Box::leak(Box::new(InternedSelector { name, hash }));
        entries.insert(name, interned);

        Ok(Selector { interned })
    }
}

impl Selector {
    /// Returns the selector's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.interned.name
    }

    /// Returns the precomputed `FxHash` of the name.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.interned.hash
    }

    /// Number of explicit arguments implied by the name's colons.
    ///
    /// ```rust
    /// use runtimekit::Selector;
    /// use std::str::FromStr;
    ///
    /// assert_eq!(Selector::from_str("description").unwrap().colon_count(), 0);
    /// assert_eq!(Selector::from_str("setValue:forKey:").unwrap().colon_count(), 2);
    /// ```
    #[must_use]
    pub fn colon_count(&self) -> usize {
        self.interned.name.matches(':').count()
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.interned, other.interned)
    }
}

impl Eq for Selector {}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.interned.hash);
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name())
            .field("hash", &format!("{:#x}", self.hash()))
            .finish()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
