//! Facade types: substitute types carrying an older host API surface.
//!
//! When a host type changes shape in a way a plain operand substitution cannot express,
//! the rewriter points old references at a facade instead. A facade owns an instance of the
//! current host type and implements each legacy member by delegating to it.
//!
//! # Key Components
//!
//! - [`RewriteFacade`] - the facade contract, including the always-failing declared constructor
//! - [`FacadeType`] - the link-level description: legacy members, inherited constructors, dispatch
//! - [`FacadeRegistry`] - facades keyed by the type they replace
//! - [`WorldDateFacade`] and [`FarmAnimalFacade`] - the facades this crate ships
//!
//! # Examples
//!
//! ```rust
//! use cilcompat::facades::FacadeRegistry;
//! use cilcompat::host::world::world_date_type;
//!
//! let registry = FacadeRegistry::with_builtin();
//! let facade = registry.for_replaced(&world_date_type().to_type_ref()).unwrap();
//! assert!(facade.construct_declared().is_err());
//! ```

mod facade;
mod farmanimal;
mod registry;
mod worlddate;

pub use facade::{FacadeInvoke, FacadeMember, FacadeType, RewriteFacade};
pub use farmanimal::FarmAnimalFacade;
pub use registry::FacadeRegistry;
pub use worlddate::WorldDateFacade;

/// Namespace all facade types are declared in.
pub const FACADE_NAMESPACE: &str = "CilCompat.Facades";

/// Assembly the facade types are linked from.
pub const FACADE_ASSEMBLY: &str = "CilCompat";
