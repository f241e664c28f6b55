//! Security subsystem: the request-admission filter.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client_ip.rs (identity from forwarding headers)
//!     → cors.rs (preflight / refused origin answered here)
//!     → rate_limit.rs + store.rs (per-IP sliding windows, hard blocks)
//!     → csrf.rs (token presence on mutating API calls)
//!     → downstream application
//!     → headers.rs (hardening headers on the way out)
//! ```
//!
//! # Design Decisions
//! - Each stage may end the chain; later stages are then skipped
//! - Failures become terminal JSON responses (rejection.rs), never errors
//! - Registry and clock are injected so the limiter is deterministic in tests

pub mod admission;
pub mod client_ip;
pub mod clock;
pub mod cors;
pub mod csrf;
pub mod headers;
pub mod rate_limit;
pub mod rejection;
pub mod store;

pub use admission::{AdmissionPolicy, AdmissionState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cors::{AllowListCors, CorsPolicy};
pub use rate_limit::{RateLimitInfo, RateLimitPolicy, RateLimiter};
pub use rejection::Rejection;
pub use store::{InMemoryStore, RateLimiterStore};
