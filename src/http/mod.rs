//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, host event surface)
//!     → request.rs (buffer body, absolute URL, request ID)
//!     → routing core dispatches to a strategy
//!     → response.rs (buffered response back to streaming form)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{GatewayRequest, MakeRequestUuid};
pub use response::GatewayResponse;
pub use server::HttpServer;
