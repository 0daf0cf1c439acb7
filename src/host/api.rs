//! The table of types currently loaded in the host process.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::{host::HostTypeDef, symbols::TypeRef};

/// Concurrent lookup table of live host type definitions.
///
/// Definitions are keyed by their definition name (`Namespace.Name`1`, nested types as
/// `Outer/Inner`), so a compiled reference to any instantiation of a generic type finds the
/// same definition. The table is populated once before rewriting starts and is read
/// concurrently by every rule afterwards.
///
/// # Thread Safety
///
/// [`HostApi`] is [`Send`] and [`Sync`]; all lookups go through [`dashmap::DashMap`] and
/// hand out [`Arc`]s, so no lock is held while a caller inspects a definition.
#[derive(Debug, Default)]
pub struct HostApi {
    types: DashMap<String, Arc<HostTypeDef>>,
    assemblies: DashSet<String>,
}

impl HostApi {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type definition, replacing any previous definition of the same name.
    ///
    /// The declaring assembly, if recorded on the type, is registered as a host assembly.
    /// Returns `false`, and stores nothing, when the type has no definition name (arrays,
    /// pointers, byrefs, generic parameters).
    pub fn register(&self, definition: HostTypeDef) -> bool {
        let Some(key) = definition.ty.definition_name() else {
            log::warn!("host type {} has no definition name, not registered", definition.ty);
            return false;
        };
        if let Some(assembly) = definition.ty.assembly() {
            self.assemblies.insert(assembly.to_string());
        }
        self.types.insert(key, Arc::new(definition));
        true
    }

    /// Marks an assembly name as belonging to the host.
    pub fn register_assembly(&self, name: &str) {
        self.assemblies.insert(name.to_string());
    }

    /// Returns `true` if `name` is one of the host's assemblies.
    #[must_use]
    pub fn owns_assembly(&self, name: &str) -> bool {
        self.assemblies.contains(name)
    }

    /// Returns `true` if `reference` points into a host assembly.
    #[must_use]
    pub fn owns_reference(&self, reference: &TypeRef) -> bool {
        reference.scope().is_some_and(|scope| self.owns_assembly(scope))
    }

    /// Looks up the definition a compiled type reference names.
    ///
    /// Generic instances resolve to their generic definition; placeholders and shapes
    /// resolve to nothing.
    #[must_use]
    pub fn find_definition(&self, reference: &TypeRef) -> Option<Arc<HostTypeDef>> {
        let key = reference.definition_name()?;
        self.find_by_name(&key)
    }

    /// Looks up a definition by its definition name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Arc<HostTypeDef>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostMethod, HostType};

    #[test]
    fn register_rejects_unnamed_types() {
        let api = HostApi::new();
        assert!(!api.register(HostTypeDef::new(HostType::array(HostType::int32()))));
        assert!(api.is_empty());
        assert!(api.register(HostTypeDef::new(HostType::named("StardewValley", "Farm"))));
        assert!(!api.is_empty());
    }

    #[test]
    fn register_and_find() {
        let api = HostApi::new();
        assert!(api.is_empty());

        let list = HostType::generic(
            "System.Collections.Generic",
            "List`1",
            vec![HostType::string()],
        )
        .in_assembly("System.Runtime");
        api.register(HostTypeDef::new(list).method(HostMethod::new("Clear", HostType::void())));

        let reference = TypeRef::generic(
            "System.Collections.Generic",
            "List`1",
            vec![TypeRef::int32()],
        );
        let found = api.find_definition(&reference).unwrap();
        assert_eq!(found.methods_named("Clear").count(), 1);
        assert_eq!(api.len(), 1);

        assert!(api.owns_assembly("System.Runtime"));
        assert!(!api.owns_assembly("SpaceCore"));
        assert!(api.find_definition(&TypeRef::type_param(0)).is_none());
    }

    #[test]
    fn owns_reference_by_scope() {
        let api = HostApi::new();
        api.register_assembly("Stardew Valley");

        let owned = TypeRef::named("StardewValley", "Object").with_scope("Stardew Valley");
        let foreign = TypeRef::named("SpaceCore", "Skills").with_scope("SpaceCore");
        assert!(api.owns_reference(&owned));
        assert!(!api.owns_reference(&foreign));
        assert!(!api.owns_reference(&TypeRef::named("StardewValley", "Object")));
    }
}
