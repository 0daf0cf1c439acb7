//! Exact structural comparison of symbol descriptors.
//!
//! Every function here is pure and total: an answer of `false` (or `None`) is the normal
//! outcome for a reference that does not match, never an error. Ambiguity resolves to "no
//! match".
//!
//! Two descriptors denote the same type only if namespace and simple name match, enclosing
//! types match recursively and, for generic instances, the arities agree and every generic
//! argument matches by the same rule. A generic instance never matches a non-generic type,
//! whatever its name. Return types never take part in method signature matching.
//!
//! # Examples
//!
//! ```rust
//! use cilcompat::host::HostType;
//! use cilcompat::symbols::{matcher::is_same_type, TypeRef};
//!
//! let live = HostType::generic("System.Collections.Generic", "List`1", vec![HostType::string()]);
//! let compiled = TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::string()]);
//! let other = TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::int32()]);
//!
//! assert!(is_same_type(&live, &compiled));
//! assert!(!is_same_type(&live, &other));
//! ```

use crate::{
    host::{HostMethod, HostType, HostTypeDef},
    symbols::{heuristic::looks_like_same_type, MethodRef, NamedType, TypeRef},
};

/// How strongly two descriptors were found to match.
///
/// Ordered so that the weaker tier compares lower: the confidence of a compound match (a
/// method signature) is the minimum of its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchConfidence {
    /// Generic placeholders were mapped onto each other; the types are probably the same.
    Heuristic,
    /// The descriptors are structurally identical.
    Exact,
}

/// Returns `true` if a live host type and a compiled reference denote the same type.
#[must_use]
pub fn is_same_type(definition: &HostType, reference: &TypeRef) -> bool {
    match (definition, reference) {
        (HostType::Named { .. }, TypeRef::Named(named)) => is_same_named(definition, named),
        (
            HostType::Array { element, rank },
            TypeRef::Array {
                element: ref_element,
                rank: ref_rank,
            },
        ) => rank == ref_rank && is_same_type(element, ref_element),
        (HostType::ByRef(inner), TypeRef::ByRef(ref_inner))
        | (HostType::Pointer(inner), TypeRef::Pointer(ref_inner)) => is_same_type(inner, ref_inner),
        _ => false,
    }
}

fn is_same_named(definition: &HostType, reference: &NamedType) -> bool {
    let HostType::Named {
        namespace,
        name,
        declaring,
        generic_args,
        ..
    } = definition
    else {
        return false;
    };

    if *namespace != reference.namespace || *name != reference.name {
        return false;
    }

    let same_declaring = match (declaring, &reference.declaring) {
        (None, None) => true,
        (Some(outer), Some(ref_outer)) => is_same_named(outer, ref_outer),
        _ => false,
    };
    if !same_declaring {
        return false;
    }

    generic_args.len() == reference.generic_args.len()
        && generic_args
            .iter()
            .zip(&reference.generic_args)
            .all(|(arg, ref_arg)| is_same_type(arg, ref_arg))
}

/// Returns `true` if two compiled references denote the same type.
///
/// Follows the same rule as [`is_same_type`]. A generic placeholder is only equal to a
/// placeholder with the same owner, position and name; the looser placeholder-mapping
/// comparison lives in [`crate::symbols::heuristic`].
#[must_use]
pub fn is_same_type_ref(a: &TypeRef, b: &TypeRef) -> bool {
    match (a, b) {
        (TypeRef::Named(a), TypeRef::Named(b)) => is_same_named_ref(a, b),
        (TypeRef::GenericParam(a), TypeRef::GenericParam(b)) => a == b,
        (
            TypeRef::Array {
                element: a_element,
                rank: a_rank,
            },
            TypeRef::Array {
                element: b_element,
                rank: b_rank,
            },
        ) => a_rank == b_rank && is_same_type_ref(a_element, b_element),
        (TypeRef::ByRef(a), TypeRef::ByRef(b)) | (TypeRef::Pointer(a), TypeRef::Pointer(b)) => is_same_type_ref(a, b),
        _ => false,
    }
}

fn is_same_named_ref(a: &NamedType, b: &NamedType) -> bool {
    if a.namespace != b.namespace || a.name != b.name {
        return false;
    }

    let same_declaring = match (&a.declaring, &b.declaring) {
        (None, None) => true,
        (Some(a), Some(b)) => is_same_named_ref(a, b),
        _ => false,
    };

    same_declaring
        && a.generic_args.len() == b.generic_args.len()
        && a.generic_args
            .iter()
            .zip(&b.generic_args)
            .all(|(a, b)| is_same_type_ref(a, b))
}

/// Compares two compiled references and reports how strongly they match.
///
/// Returns [`MatchConfidence::Exact`] if [`is_same_type_ref`] holds,
/// [`MatchConfidence::Heuristic`] if only the placeholder-mapping comparison holds, and
/// `None` otherwise.
#[must_use]
pub fn match_type(a: &TypeRef, b: &TypeRef) -> Option<MatchConfidence> {
    if is_same_type_ref(a, b) {
        Some(MatchConfidence::Exact)
    } else if looks_like_same_type(Some(a), Some(b)) {
        Some(MatchConfidence::Heuristic)
    } else {
        None
    }
}

/// Returns `true` if a host method has the name and parameter types a compiled reference expects.
///
/// The return type is not compared.
#[must_use]
pub fn has_matching_signature(definition: &HostMethod, reference: &MethodRef) -> bool {
    definition.name == reference.name
        && definition.parameters.len() == reference.parameters.len()
        && definition
            .parameters
            .iter()
            .zip(&reference.parameters)
            .all(|(param, ref_param)| is_same_type(&param.ty, ref_param))
}

/// Returns `true` if two method descriptors have the same name and parameter types.
///
/// The return type is not compared.
#[must_use]
pub fn has_matching_signature_ref(definition: &MethodRef, reference: &MethodRef) -> bool {
    definition.name == reference.name
        && definition.parameters.len() == reference.parameters.len()
        && definition
            .parameters
            .iter()
            .zip(&reference.parameters)
            .all(|(a, b)| is_same_type_ref(a, b))
}

/// Like [`has_matching_signature_ref`], but tolerating placeholders and reporting the
/// weakest confidence among the parameter comparisons.
#[must_use]
pub fn match_signature(definition: &MethodRef, reference: &MethodRef) -> Option<MatchConfidence> {
    if definition.name != reference.name || definition.parameters.len() != reference.parameters.len() {
        return None;
    }

    definition
        .parameters
        .iter()
        .zip(&reference.parameters)
        .try_fold(MatchConfidence::Exact, |weakest, (a, b)| {
            match_type(a, b).map(|confidence| weakest.min(confidence))
        })
}

/// Returns `true` if the host type declares a member the compiled method reference can bind to.
///
/// Constructor references are searched among the constructors; everything else among the
/// declared methods.
#[must_use]
pub fn type_has_matching_method(definition: &HostTypeDef, reference: &MethodRef) -> bool {
    let candidates = if reference.is_constructor() {
        &definition.constructors
    } else {
        &definition.methods
    };

    candidates
        .iter()
        .any(|method| has_matching_signature(method, reference))
}

/// Returns `true` if a compiled reference and a live type share namespace and simple name.
///
/// This is a cheap pre-filter only: `List`1<String>` and `List`1<Int32>` pass it. Both sides
/// absent counts as equal; one side absent does not.
#[must_use]
pub fn has_same_namespace_and_name(reference: Option<&TypeRef>, definition: Option<&HostType>) -> bool {
    match (reference, definition) {
        (None, None) => true,
        (Some(reference), Some(definition)) => {
            reference.namespace() == definition.namespace() && reference.name() == definition.name()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::GenericOwner;

    fn dictionary(key: TypeRef, value: TypeRef) -> TypeRef {
        TypeRef::generic("System.Collections.Generic", "Dictionary`2", vec![key, value])
    }

    #[test]
    fn non_generic_identity() {
        let live = HostType::named("StardewValley", "Farmer");
        assert!(is_same_type(&live, &TypeRef::named("StardewValley", "Farmer")));
        assert!(!is_same_type(&live, &TypeRef::named("StardewValley", "NPC")));
        assert!(!is_same_type(&live, &TypeRef::named("StardewValley.Characters", "Farmer")));
        assert!(is_same_type_ref(
            &TypeRef::named("StardewValley", "Farmer"),
            &TypeRef::named("StardewValley", "Farmer")
        ));
    }

    #[test]
    fn generic_vs_non_generic_never_matches() {
        let live = HostType::named("System.Collections.Generic", "List`1");
        let reference = TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::string()]);
        assert!(!is_same_type(&live, &reference));

        let open = TypeRef::named("System.Collections.Generic", "List`1");
        assert!(!is_same_type_ref(&open, &reference));
    }

    #[test]
    fn generic_arity_mismatch() {
        let live = HostType::generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![HostType::string(), HostType::int32()],
        );
        let reference = TypeRef::generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![TypeRef::string()],
        );
        assert!(!is_same_type(&live, &reference));
        assert!(is_same_type(&live, &dictionary(TypeRef::string(), TypeRef::int32())));
        assert!(!is_same_type(&live, &dictionary(TypeRef::int32(), TypeRef::string())));
    }

    #[test]
    fn nested_generic_arguments() {
        let net_ref = |arg| HostType::generic("Netcode", "NetRef`1", vec![arg]);
        let live = HostType::generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![HostType::string(), net_ref(HostType::named("StardewValley", "Item"))],
        );

        let good = dictionary(
            TypeRef::string(),
            TypeRef::generic("Netcode", "NetRef`1", vec![TypeRef::named("StardewValley", "Item")]),
        );
        let bad = dictionary(
            TypeRef::string(),
            TypeRef::generic("Netcode", "NetRef`1", vec![TypeRef::named("StardewValley", "Object")]),
        );
        assert!(is_same_type(&live, &good));
        assert!(!is_same_type(&live, &bad));
    }

    #[test]
    fn entry_points_agree() {
        let cases = vec![
            HostType::named("StardewValley", "Farmer"),
            HostType::generic("System.Collections.Generic", "List`1", vec![HostType::int32()]),
            HostType::nested(HostType::named("StardewValley.Menus", "ShopMenu"), "Tab"),
            HostType::array(HostType::string()),
            HostType::by_ref(HostType::int32()),
        ];
        let references = vec![
            TypeRef::named("StardewValley", "Farmer"),
            TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::int32()]),
            TypeRef::nested(TypeRef::named("StardewValley.Menus", "ShopMenu"), "Tab").unwrap(),
            TypeRef::array(TypeRef::string()),
            TypeRef::by_ref(TypeRef::int32()),
            TypeRef::type_param(0),
        ];

        for live in &cases {
            let as_ref = live.to_type_ref();
            for reference in &references {
                assert_eq!(
                    is_same_type(live, reference),
                    is_same_type_ref(&as_ref, reference),
                    "{live} vs {reference}"
                );
            }
        }
    }

    #[test]
    fn shapes_must_agree() {
        let live = HostType::array(HostType::int32());
        assert!(!is_same_type(&live, &TypeRef::int32()));
        assert!(!is_same_type(&live, &TypeRef::by_ref(TypeRef::int32())));
        let matrix = TypeRef::Array {
            element: Box::new(TypeRef::int32()),
            rank: 2,
        };
        assert!(!is_same_type(&live, &matrix));
    }

    #[test]
    fn placeholders_exact() {
        let a = TypeRef::type_param(0);
        assert!(is_same_type_ref(&a, &TypeRef::type_param(0)));
        assert!(!is_same_type_ref(&a, &TypeRef::type_param(1)));
        assert!(!is_same_type_ref(&a, &TypeRef::method_param(0)));
        assert!(!is_same_type_ref(&a, &TypeRef::named_param(GenericOwner::Type, 0, "T")));
    }

    #[test]
    fn match_type_confidence() {
        let compiled = dictionary(TypeRef::type_param(0), TypeRef::type_param(1));
        let declared = dictionary(
            TypeRef::named_param(GenericOwner::Type, 0, "TKey"),
            TypeRef::named_param(GenericOwner::Type, 1, "TValue"),
        );

        assert_eq!(match_type(&compiled, &compiled), Some(MatchConfidence::Exact));
        assert_eq!(match_type(&compiled, &declared), Some(MatchConfidence::Heuristic));
        assert_eq!(
            match_type(&compiled, &dictionary(TypeRef::string(), TypeRef::int32())),
            None
        );
        assert!(MatchConfidence::Heuristic < MatchConfidence::Exact);
    }

    #[test]
    fn signature_ignores_return_type() {
        let farmer = TypeRef::named("StardewValley", "Farmer");
        let definition = HostMethod::new("addItem", HostType::boolean()).param("item", HostType::object());

        let returns_void = MethodRef::new(farmer.clone(), "addItem", TypeRef::void(), vec![TypeRef::object()]);
        let returns_bool = MethodRef::new(farmer.clone(), "addItem", TypeRef::boolean(), vec![TypeRef::object()]);
        assert!(has_matching_signature(&definition, &returns_void));
        assert!(has_matching_signature(&definition, &returns_bool));

        let two_args = MethodRef::new(
            farmer.clone(),
            "addItem",
            TypeRef::boolean(),
            vec![TypeRef::object(), TypeRef::int32()],
        );
        assert!(!has_matching_signature(&definition, &two_args));

        let renamed = MethodRef::new(farmer, "AddItem", TypeRef::boolean(), vec![TypeRef::object()]);
        assert!(!has_matching_signature(&definition, &renamed));

        assert!(has_matching_signature_ref(&returns_void, &returns_bool));
        assert!(!has_matching_signature_ref(&returns_void, &two_args));
    }

    #[test]
    fn signature_confidence_is_weakest_part() {
        let owner = TypeRef::named("StardewValley", "Utility");
        let declared = MethodRef::new(
            owner.clone(),
            "Shuffle",
            TypeRef::void(),
            vec![
                TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::named_param(
                    GenericOwner::Method,
                    0,
                    "T",
                )]),
                TypeRef::int32(),
            ],
        );
        let compiled = MethodRef::new(
            owner,
            "Shuffle",
            TypeRef::void(),
            vec![
                TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::method_param(0)]),
                TypeRef::int32(),
            ],
        );

        assert_eq!(match_signature(&declared, &compiled), Some(MatchConfidence::Heuristic));
        assert_eq!(match_signature(&compiled, &compiled), Some(MatchConfidence::Exact));
        assert!(!has_matching_signature_ref(&declared, &compiled));
    }

    #[test]
    fn constructor_lookup_uses_constructors() {
        let date = HostType::named("StardewValley", "WorldDate");
        let definition = HostTypeDef::new(date.clone())
            .constructor(HostMethod::constructor().param("year", HostType::int32()))
            .method(HostMethod::new("Now", date.clone()).static_method());

        let ctor = MethodRef::constructor(date.to_type_ref(), vec![TypeRef::int32()]);
        assert!(type_has_matching_method(&definition, &ctor));

        let missing_ctor = MethodRef::constructor(date.to_type_ref(), vec![]);
        assert!(!type_has_matching_method(&definition, &missing_ctor));

        let now = MethodRef::new(date.to_type_ref(), "Now", date.to_type_ref(), vec![]);
        assert!(type_has_matching_method(&definition, &now));
    }

    #[test]
    fn namespace_and_name_prefilter() {
        let live = HostType::named("System.Collections.Generic", "List`1");
        let instance = TypeRef::generic("System.Collections.Generic", "List`1", vec![TypeRef::string()]);

        assert!(has_same_namespace_and_name(Some(&instance), Some(&live)));
        assert!(!is_same_type(&live, &instance));
        assert!(has_same_namespace_and_name(None, None));
        assert!(!has_same_namespace_and_name(Some(&instance), None));
        assert!(!has_same_namespace_and_name(None, Some(&live)));
    }
}
