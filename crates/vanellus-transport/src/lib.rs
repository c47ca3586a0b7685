//! # Vanellus Transport
//!
//! The contract between Vanellus clients and the relay.
//!
//! ## Key Types
//!
//! - [`Transport`] - one async `call(method, params, signing_key)` entry point
//! - [`TransportError`] - network, server and authorization failures
//! - [`methods`] - relay method names
//! - [`memory::MemoryRelay`] - an in-memory relay for tests
//!
//! The transport never sees plaintext: clients sign and encrypt payloads
//! before handing them over.

pub mod error;
pub mod memory;
pub mod methods;
pub mod transport;

pub use error::{Result, TransportError};
pub use memory::MemoryRelay;
pub use transport::Transport;
