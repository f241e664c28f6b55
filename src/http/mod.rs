//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID)
//!     → middleware/admission.rs (security stages)
//!     → proxy.rs (forward to the downstream application)
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use proxy::Upstream;
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{build_router, HttpServer};
