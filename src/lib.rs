// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilcompat
//!
//! Rewrites the CIL bytecode of compiled .NET mod assemblies so references to host APIs that
//! changed shape keep working. Mods are compiled against one version of a game; when the
//! game renames a type, changes a property's type or adds a parameter, every existing mod
//! that touches that member breaks at link time. `cilcompat` inspects each instruction of a
//! mod's method bodies, compares the references it finds against the live host API, and
//! either rewrites them to something that still resolves or reports them as broken.
//!
//! ## Features
//!
//! - **Structural symbol matching** - exact comparison of compiled references against live
//!   definitions, with an explicit heuristic tier for compiler-generated placeholder names
//! - **Lossless method body codec** - tiny and fat headers, exception sections, tokens
//!   resolved to descriptors and back
//! - **Safe editing** - inserts and removals keep branch targets and exception regions attached
//! - **Branch widening** - short branches pushed out of range are converted to long form
//! - **Facades** - substitute types carrying an older member surface over the current object
//! - **Parallel rewriting** - method bodies are rewritten concurrently with `rayon`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cilcompat::prelude::*;
//! use cilcompat::host::world::{game_api, world_date_type};
//!
//! let rewriter = Rewriter::new(
//!     Arc::new(game_api()),
//!     Arc::new(FacadeRegistry::with_builtin()),
//!     RewriteConfig::default(),
//! )
//! .with_standard_rules();
//!
//! // `new WorldDate()` compiled against the old API
//! let ctor = MethodRef::constructor(world_date_type().to_type_ref(), vec![]);
//! let mut body = MethodBody::new(vec![
//!     Instruction::new(OpCode::NEWOBJ, Operand::Method(ctor))?,
//!     Instruction::simple(OpCode::RET)?,
//! ]);
//!
//! let report = rewriter.rewrite_body("Mod.Entry::Load", &mut body)?;
//! assert_eq!(report.rewrites, 1);
//! # Ok::<(), cilcompat::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`symbols`] - compiled-side descriptors and the matcher
//! - [`host`] - the live host API table and the current game objects
//! - [`assembly`] - CIL instructions, decoding, layout and encoding
//! - [`metadata`] - tokens, method bodies, token resolution
//! - [`facades`] - facade contract, shipped facades and their registry
//! - [`rewriter`] - rules, pipeline, configuration and reports
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Logging
//!
//! The pipeline logs through the [`log`](https://docs.rs/log) facade: rewrites at `debug`,
//! broken references at `warn`, layout statistics at `trace`. The embedding application
//! installs the logger.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust
//! use cilcompat::{metadata::method::MethodBody, metadata::scope::ReferenceScope, Error};
//!
//! match MethodBody::decode(&[0x0A, 0x00], &ReferenceScope::new()) {
//!     Ok(_) => println!("decoded"),
//!     Err(Error::OutOfBounds) => println!("truncated body"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! ```
//!
//! ## Standards Compliance
//!
//! Method bodies and instructions follow **ECMA-335** (6th edition), partitions II.25.4 and III.
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run methodbody --release
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilcompat::prelude::*;
///
/// let config = RewriteConfig::lenient();
/// assert!(config.allow_heuristic_matches);
/// ```
pub mod prelude;

pub mod assembly;
pub mod facades;
pub mod host;
pub mod metadata;
pub mod rewriter;
pub mod symbols;

/// `cilcompat` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilcompat` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Low-level cursor over method code bytes.
pub use file::parser::Parser;
