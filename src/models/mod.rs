//! Data models for the request tracker.
//!
//! JSON shapes match the dashboard's TypeScript types so the existing frontend can talk to
//! this backend unchanged.

mod account;
mod label;
mod request;
mod sync;

pub use account::*;
pub use label::*;
pub use request::*;
pub use sync::*;
