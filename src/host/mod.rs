//! The live host API: what is actually loaded in the host process.
//!
//! Rewrite rules compare compiled references against this model to decide whether a
//! reference still resolves, and facades delegate to the game objects in [`world`].
//!
//! # Key Components
//!
//! - [`crate::host::HostType`] / [`crate::host::HostTypeDef`] - concrete live types and their member surface
//! - [`crate::host::HostApi`] - concurrent lookup table of live type definitions
//! - [`crate::host::HostValue`] - literals and object references crossing the API
//! - [`crate::host::world`] - current game objects and their API description

mod api;
mod types;
mod value;
pub mod world;

pub use api::HostApi;
pub use types::{HostField, HostMethod, HostParameter, HostProperty, HostType, HostTypeDef};
pub use value::HostValue;
