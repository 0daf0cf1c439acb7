//! Lookup table of registered facades.

use std::{any::Any, sync::Arc};

use dashmap::DashMap;

use crate::{
    facades::{FacadeType, FarmAnimalFacade, RewriteFacade, WorldDateFacade},
    host::HostValue,
    symbols::{MethodRef, TypeRef},
    Error, Result,
};

/// Facades keyed by the definition name of the type they replace, and by their own name.
///
/// The registry must be populated before any rule that redirects references to facades
/// runs; it is read concurrently afterwards.
#[derive(Debug, Default)]
pub struct FacadeRegistry {
    by_replaced: DashMap<String, Arc<FacadeType>>,
    by_facade: DashMap<String, Arc<FacadeType>>,
}

impl FacadeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every facade this crate ships.
    #[must_use]
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register::<WorldDateFacade>();
        registry.register::<FarmAnimalFacade>();
        registry
    }

    /// Registers facade `F`, replacing any facade previously registered for the same type.
    pub fn register<F: RewriteFacade>(&self) -> bool {
        self.insert(F::facade_type())
    }

    /// Registers a facade description.
    ///
    /// Returns `false`, and stores nothing, when the facade or the type it replaces has no
    /// definition name.
    pub fn insert(&self, facade: FacadeType) -> bool {
        let (Some(replaced), Some(name)) = (facade.replaces.definition_name(), facade.ty.definition_name()) else {
            log::warn!("facade {} over {} cannot be keyed, not registered", facade.ty, facade.replaces);
            return false;
        };
        let facade = Arc::new(facade);
        self.by_replaced.insert(replaced, Arc::clone(&facade));
        self.by_facade.insert(name, facade);
        true
    }

    /// The facade taking over references to `replaced`, if any.
    #[must_use]
    pub fn for_replaced(&self, replaced: &TypeRef) -> Option<Arc<FacadeType>> {
        let key = replaced.definition_name()?;
        self.by_replaced.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// The facade a rewritten reference points at, if `facade` names one.
    #[must_use]
    pub fn get(&self, facade: &TypeRef) -> Option<Arc<FacadeType>> {
        let key = facade.definition_name()?;
        self.by_facade.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if `reference` names a registered facade.
    #[must_use]
    pub fn is_facade(&self, reference: &TypeRef) -> bool {
        self.get(reference).is_some()
    }

    fn declaring_facade(&self, method: &MethodRef) -> Result<Arc<FacadeType>> {
        self.get(&method.declaring_type)
            .ok_or_else(|| Error::FacadeMismatch(format!("{} is not a facade type", method.declaring_type)))
    }

    /// Dispatches a rewritten call to a facade member.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if `method` is not declared by a registered facade
    /// or the member rejects the receiver or arguments.
    pub fn invoke(&self, method: &MethodRef, receiver: &mut dyn Any, args: &[HostValue]) -> Result<Option<HostValue>> {
        self.declaring_facade(method)?.invoke(method, receiver, args)
    }

    /// Satisfies a rewritten `newobj` on a facade constructor.
    ///
    /// # Errors
    /// Returns [`Error::FacadeMismatch`] if `method` is not an inherited constructor of a
    /// registered facade or the base rejects the arguments.
    pub fn invoke_constructor(&self, method: &MethodRef, args: &[HostValue]) -> Result<Box<dyn Any + Send>> {
        self.declaring_facade(method)?.construct(method, args)
    }

    /// Number of registered facades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_facade.len()
    }

    /// Returns `true` if no facade is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_facade.is_empty()
    }
}
