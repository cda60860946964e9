// Storage backends for the concierge gateway
//
// Two stateful shared resources live here: the session store and the rate
// limiter. Both come as a trait with a Redis production implementation and
// an in-memory implementation for tests and Redis-less development.
//
// Failure philosophy (availability over strictness):
// - the session store fails SOFT: errors read as absence, writes are no-ops
// - the rate limiter fails OPEN: an unreachable backend admits traffic

pub mod memory;
pub mod rate_limit;
pub mod session_store;

pub use memory::{MemoryRateLimiter, MemorySessionStore};
pub use rate_limit::{Admission, RateLimiter, RedisRateLimiter, RATE_WINDOW};
pub use session_store::{RedisSessionStore, SessionStore};
