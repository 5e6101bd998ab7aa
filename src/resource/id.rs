use std::fmt;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use super::{ResourceError, ResourceResult};

/// Stable handle of a registered resource
///
/// Holders keep the id, not the resource itself; the id survives reloads
/// and renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Never handed out by the registry
    pub const INVALID: ResourceId = ResourceId(0);

    /// Deterministic id derived from a name alone
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(name.as_bytes());
        ResourceId(finalize(hasher.finish()))
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Draws fresh ids from a monotonic counter mixed with the name hash
///
/// The counter never repeats within one generator, so a collision can only
/// come from an id that was supplied explicitly at registration. Those are
/// retried a bounded number of times.
#[derive(Debug)]
pub struct ResourceIdGenerator {
    counter: u64,
    retry_limit: u32,
}

impl ResourceIdGenerator {
    pub fn new(retry_limit: u32) -> Self {
        Self {
            counter: 0,
            retry_limit: retry_limit.max(1),
        }
    }

    /// Next id for `name` that `is_taken` rejects
    pub fn next(&mut self, name: &str, is_taken: impl Fn(ResourceId) -> bool) -> ResourceResult<ResourceId> {
        let base = ResourceId::from_name(name).0;

        for attempt in 0..self.retry_limit {
            self.counter = self.counter.wrapping_add(1);
            let id = ResourceId(finalize(base ^ self.counter.wrapping_mul(0x9E37_79B9_7F4A_7C15)));

            if id.is_valid() && !is_taken(id) {
                return Ok(id);
            }

            log::debug!(
                "Resource id {} for '{}' collided (attempt {}/{})",
                id,
                name,
                attempt + 1,
                self.retry_limit
            );
        }

        Err(ResourceError::IdSpaceExhausted {
            name: name.to_string(),
            attempts: self.retry_limit,
        })
    }
}

/// splitmix64 finalizer
fn finalize(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
