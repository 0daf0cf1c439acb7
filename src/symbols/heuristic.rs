//! Placeholder-tolerant type comparison.
//!
//! Compiled references frequently name generic parameters only by position (`!0`), while the
//! declarations they are compared against carry the declared name (`TKey`). Exact matching
//! rejects such pairs; [`looks_like_same_type`] accepts them as long as the placeholders on
//! one side map onto the placeholders on the other side consistently, in both directions.
//!
//! ```text
//! Dictionary`2<!0,NetRef`1<!1>>   ~  Dictionary`2<TKey,NetRef`1<TValue>>   (!0<->TKey, !1<->TValue)
//! Dictionary`2<!0,!0>             !~ Dictionary`2<TKey,TValue>             (!0 mapped twice)
//! List`1<!0>                      !~ List`1<String>                        (placeholder vs concrete)
//! ```

use std::collections::HashMap;

use crate::symbols::{GenericOwner, GenericParam, NamedType, TypeRef};

/// Identity of a placeholder for mapping purposes.
type ParamKey<'a> = (GenericOwner, u32, Option<&'a str>);

#[derive(Default)]
struct PlaceholderMap<'a> {
    forward: HashMap<ParamKey<'a>, ParamKey<'a>>,
    backward: HashMap<ParamKey<'a>, ParamKey<'a>>,
}

impl<'a> PlaceholderMap<'a> {
    fn bind(&mut self, a: &'a GenericParam, b: &'a GenericParam) -> bool {
        if a.owner != b.owner {
            return false;
        }

        let a_key = (a.owner, a.index, a.name.as_deref());
        let b_key = (b.owner, b.index, b.name.as_deref());

        match (self.forward.get(&a_key), self.backward.get(&b_key)) {
            (None, None) => {
                self.forward.insert(a_key, b_key);
                self.backward.insert(b_key, a_key);
                true
            }
            (Some(mapped_b), Some(mapped_a)) => *mapped_b == b_key && *mapped_a == a_key,
            _ => false,
        }
    }

    fn types(&mut self, a: &'a TypeRef, b: &'a TypeRef) -> bool {
        match (a, b) {
            (TypeRef::GenericParam(a), TypeRef::GenericParam(b)) => self.bind(a, b),
            (TypeRef::Named(a), TypeRef::Named(b)) => self.named(a, b),
            (
                TypeRef::Array {
                    element: a_element,
                    rank: a_rank,
                },
                TypeRef::Array {
                    element: b_element,
                    rank: b_rank,
                },
            ) => a_rank == b_rank && self.types(a_element, b_element),
            (TypeRef::ByRef(a), TypeRef::ByRef(b)) | (TypeRef::Pointer(a), TypeRef::Pointer(b)) => self.types(a, b),
            _ => false,
        }
    }

    fn named(&mut self, a: &'a NamedType, b: &'a NamedType) -> bool {
        if a.namespace != b.namespace || a.name != b.name {
            return false;
        }

        let same_declaring = match (&a.declaring, &b.declaring) {
            (None, None) => true,
            (Some(a), Some(b)) => self.named(a, b),
            _ => false,
        };

        same_declaring
            && a.generic_args.len() == b.generic_args.len()
            && a.generic_args
                .iter()
                .zip(&b.generic_args)
                .all(|(a, b)| self.types(a, b))
    }
}

/// Returns `true` if two type references probably denote the same type.
///
/// Structurally identical references always match. Generic placeholders match other
/// placeholders of the same owner (type-level or method-level) as long as the mapping stays
/// one-to-one across the whole comparison; a placeholder never matches a concrete type.
/// Both references absent counts as a match, exactly one absent does not.
#[must_use]
pub fn looks_like_same_type(a: Option<&TypeRef>, b: Option<&TypeRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => PlaceholderMap::default().types(a, b),
        _ => false,
    }
}
