//! Detects host references that no longer resolve.

use std::sync::Arc;

use crate::{
    assembly::Operand,
    host::{HostApi, HostType, HostTypeDef},
    metadata::method::MethodBody,
    rewriter::rules::{RewriteContext, RewriteRule, RuleOutcome},
    symbols::{
        matcher::{has_matching_signature, is_same_type, type_has_matching_method},
        FieldRef, MethodRef, Symbol, TypeRef,
    },
    Result,
};

/// Result of resolving a member against a type and its known bases.
enum Lookup {
    Found,
    Missing,
    /// An unregistered host base type might declare the member
    Unknown,
}

/// Reports references into host assemblies that match no live type or member.
///
/// Only references whose scope is a registered host assembly are checked. Members are looked
/// up along the base type chain until it leaves the host assemblies; if it reaches a host
/// type missing from the table the reference is given the benefit of the doubt. A member
/// that resolves but whose return or field type changed is reported too. This rule
/// never edits the body and belongs last in the rule list, after every rule that could have
/// repaired the reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokenReferenceRule;

impl BrokenReferenceRule {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        BrokenReferenceRule
    }

    fn lookup(host: &HostApi, ty: &TypeRef, found: impl Fn(&HostTypeDef) -> bool) -> Option<Lookup> {
        let mut current: Arc<HostTypeDef> = host.find_definition(ty)?;
        loop {
            if found(&current) {
                return Some(Lookup::Found);
            }
            let Some(base) = current.base.as_ref().map(HostType::to_type_ref) else {
                return Some(Lookup::Missing);
            };
            if !host.owns_reference(&base) {
                return Some(Lookup::Missing);
            }
            let Some(next) = host.find_definition(&base) else {
                return Some(Lookup::Unknown);
            };
            current = next;
        }
    }

    /// Reports the first host type `ty` mentions, generic arguments and element types
    /// included, that has no live definition.
    fn check_type(host: &HostApi, ty: &TypeRef) -> Option<String> {
        match ty {
            TypeRef::Named(named) => {
                if host.owns_reference(ty) && host.find_definition(ty).is_none() {
                    return Some(format!("no type {ty} in {}", ty.scope().unwrap_or_default()));
                }
                named.generic_args.iter().find_map(|arg| Self::check_type(host, arg))
            }
            TypeRef::Array { element, .. } => Self::check_type(host, element),
            TypeRef::ByRef(inner) | TypeRef::Pointer(inner) => Self::check_type(host, inner),
            TypeRef::GenericParam(_) => None,
        }
    }

    fn check_signature(host: &HostApi, method: &MethodRef) -> Option<String> {
        std::iter::once(&method.return_type)
            .chain(&method.parameters)
            .chain(&method.generic_args)
            .find_map(|ty| Self::check_type(host, ty))
    }

    fn check_method(host: &HostApi, method: &MethodRef) -> Option<String> {
        if let Some(reason) =
            Self::check_type(host, &method.declaring_type).or_else(|| Self::check_signature(host, method))
        {
            return Some(reason);
        }
        if !host.owns_reference(&method.declaring_type) {
            return None;
        }

        // constructors are not inherited
        let lookup = if method.is_constructor() {
            host.find_definition(&method.declaring_type).map(|definition| {
                if type_has_matching_method(&definition, method) {
                    Lookup::Found
                } else {
                    Lookup::Missing
                }
            })
        } else {
            Self::lookup(host, &method.declaring_type, |definition| {
                type_has_matching_method(definition, method)
            })
        };
        match lookup {
            Some(Lookup::Missing) => return Some(format!("no method matching {method}")),
            Some(Lookup::Found) => {}
            Some(Lookup::Unknown) | None => return None,
        }

        let mut current = host.find_definition(&method.declaring_type);
        while let Some(definition) = current {
            let candidates = if method.is_constructor() {
                &definition.constructors
            } else {
                &definition.methods
            };
            if let Some(live) = candidates.iter().find(|live| has_matching_signature(live, method)) {
                if !is_same_type(&live.return_type, &method.return_type) {
                    return Some(format!("{method} now returns {}", live.return_type));
                }
                return None;
            }
            current = definition
                .base
                .as_ref()
                .and_then(|base| host.find_definition(&base.to_type_ref()));
        }
        None
    }

    fn check_field(host: &HostApi, field: &FieldRef) -> Option<String> {
        if let Some(reason) =
            Self::check_type(host, &field.declaring_type).or_else(|| Self::check_type(host, &field.field_type))
        {
            return Some(reason);
        }
        if !host.owns_reference(&field.declaring_type) {
            return None;
        }

        let lookup = Self::lookup(host, &field.declaring_type, |definition| {
            definition.find_field(&field.name).is_some()
        });
        match lookup {
            Some(Lookup::Missing) => return Some(format!("no field {field}")),
            Some(Lookup::Found) => {}
            Some(Lookup::Unknown) | None => return None,
        }

        // the declaring type itself may not hold the field, only its bases
        let mut current = host.find_definition(&field.declaring_type);
        while let Some(definition) = current {
            if let Some(live) = definition.find_field(&field.name) {
                if !is_same_type(&live.field_type, &field.field_type) {
                    return Some(format!("{field} is now of type {}", live.field_type));
                }
                return None;
            }
            current = definition
                .base
                .as_ref()
                .and_then(|base| host.find_definition(&base.to_type_ref()));
        }
        None
    }
}

impl RewriteRule for BrokenReferenceRule {
    fn name(&self) -> &'static str {
        "broken-references"
    }

    fn handle_instruction(&self, ctx: &RewriteContext<'_>, body: &mut MethodBody, index: usize) -> Result<RuleOutcome> {
        let Some(instruction) = body.instructions.get(index) else {
            return Ok(RuleOutcome::Unchanged);
        };

        let reason = match &instruction.operand {
            Operand::Method(method) | Operand::Symbol(Symbol::Method(method)) => Self::check_method(ctx.host, method),
            Operand::Field(field) | Operand::Symbol(Symbol::Field(field)) => Self::check_field(ctx.host, field),
            Operand::Type(ty) | Operand::Symbol(Symbol::Type(ty)) => Self::check_type(ctx.host, ty),
            _ => None,
        };

        Ok(reason.map_or(RuleOutcome::Unchanged, RuleOutcome::Incompatible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::OpCode,
        facades::FacadeRegistry,
        host::world::{farm_animal_type, farm_type, game_api, world_date_type, GAME_ASSEMBLY, GAME_NAMESPACE},
        rewriter::RewriteConfig,
        test::{ctx, single},
    };

    fn check(operand: Operand, opcode: OpCode) -> RuleOutcome {
        let (host, facades, config) = (game_api(), FacadeRegistry::new(), RewriteConfig::default());
        let mut body = single(opcode, operand);
        BrokenReferenceRule
            .handle_instruction(&ctx(&host, &facades, &config), &mut body, 0)
            .unwrap()
    }

    #[test]
    fn missing_type() {
        let gone = TypeRef::named(GAME_NAMESPACE, "Coop").with_scope(GAME_ASSEMBLY);
        assert!(matches!(check(Operand::Type(gone.clone()), OpCode::CASTCLASS), RuleOutcome::Incompatible(_)));
        assert!(matches!(
            check(Operand::Type(TypeRef::array(gone.clone())), OpCode::NEWARR),
            RuleOutcome::Incompatible(_)
        ));

        // only mentioned as a generic argument
        let list_of_gone = TypeRef::generic("System.Collections.Generic", "List`1", vec![gone.clone()])
            .with_scope("System.Collections");
        let RuleOutcome::Incompatible(reason) =
            check(Operand::Method(MethodRef::constructor(list_of_gone, vec![])), OpCode::NEWOBJ)
        else {
            panic!("generic argument not checked");
        };
        assert!(reason.contains("Coop"));
        let lookup = TypeRef::generic(
            "System.Collections.Generic",
            "Dictionary`2",
            vec![TypeRef::string(), gone.clone()],
        );
        assert!(matches!(check(Operand::Type(lookup), OpCode::CASTCLASS), RuleOutcome::Incompatible(_)));

        // outside the host
        let local = TypeRef::named("MyMod", "Coop").with_scope("MyMod");
        assert_eq!(check(Operand::Type(local), OpCode::CASTCLASS), RuleOutcome::Unchanged);
    }

    #[test]
    fn missing_method_and_legacy_signature() {
        let animal = farm_animal_type().to_type_ref();
        let current = MethodRef::new(animal.clone(), "warpHome", TypeRef::void(), vec![]).instance();
        assert_eq!(check(Operand::Method(current), OpCode::CALLVIRT), RuleOutcome::Unchanged);

        let legacy = MethodRef::new(animal.clone(), "isCoopDweller", TypeRef::boolean(), vec![]).instance();
        let RuleOutcome::Incompatible(reason) = check(Operand::Method(legacy), OpCode::CALLVIRT) else {
            panic!("legacy method reported as present");
        };
        assert!(reason.contains("isCoopDweller"));

        let inherited = MethodRef::new(animal, "get_Name", TypeRef::string(), vec![]).instance();
        assert_eq!(check(Operand::Method(inherited), OpCode::CALLVIRT), RuleOutcome::Unchanged);

        // Farm extends a host type missing from the table
        let unknown = MethodRef::new(farm_type().to_type_ref(), "getMapProperty", TypeRef::string(), vec![]).instance();
        assert_eq!(check(Operand::Method(unknown), OpCode::CALLVIRT), RuleOutcome::Unchanged);

        // same parameters, different return type
        let season = MethodRef::new(world_date_type().to_type_ref(), "get_Season", TypeRef::string(), vec![]).instance();
        let RuleOutcome::Incompatible(reason) = check(Operand::Method(season), OpCode::CALLVIRT) else {
            panic!("return type change not detected");
        };
        assert!(reason.contains("now returns"));

        let ctor = MethodRef::constructor(world_date_type().to_type_ref(), vec![TypeRef::boolean()]);
        assert!(matches!(check(Operand::Method(ctor), OpCode::NEWOBJ), RuleOutcome::Incompatible(_)));
    }

    #[test]
    fn missing_type_in_member_signature() {
        let gone = TypeRef::named(GAME_NAMESPACE, "Coop").with_scope(GAME_ASSEMBLY);
        let helpers = TypeRef::named("MyMod", "Helpers").with_scope("MyMod");

        let takes = MethodRef::new(helpers.clone(), "Fill", TypeRef::void(), vec![TypeRef::array(gone.clone())]);
        assert!(matches!(check(Operand::Method(takes), OpCode::CALL), RuleOutcome::Incompatible(_)));

        let returns = MethodRef::new(helpers.clone(), "Find", gone.clone(), vec![]);
        assert!(matches!(check(Operand::Method(returns), OpCode::CALL), RuleOutcome::Incompatible(_)));

        let mut instantiated = MethodRef::new(helpers.clone(), "Make", TypeRef::void(), vec![]);
        instantiated.generic_args = vec![gone.clone()];
        assert!(matches!(check(Operand::Method(instantiated), OpCode::CALL), RuleOutcome::Incompatible(_)));

        let field = FieldRef::new(helpers.clone(), "cache", gone);
        assert!(matches!(check(Operand::Field(field), OpCode::LDSFLD), RuleOutcome::Incompatible(_)));

        let fine = MethodRef::new(helpers, "Count", TypeRef::int32(), vec![TypeRef::string()]);
        assert_eq!(check(Operand::Method(fine), OpCode::CALL), RuleOutcome::Unchanged);
    }

    #[test]
    fn field_type_change() {
        let data = TypeRef::named("StardewValley.GameData.FarmAnimals", "FarmAnimalData").with_scope("StardewValley.GameData");
        let house = FieldRef::new(data.clone(), "House", TypeRef::string());
        assert_eq!(check(Operand::Field(house), OpCode::LDFLD), RuleOutcome::Unchanged);

        let changed = FieldRef::new(data.clone(), "House", TypeRef::int32());
        assert!(matches!(check(Operand::Field(changed), OpCode::LDFLD), RuleOutcome::Incompatible(_)));

        let missing = FieldRef::new(data, "Price", TypeRef::int32());
        assert!(matches!(
            check(Operand::Symbol(Symbol::Field(missing)), OpCode::LDTOKEN),
            RuleOutcome::Incompatible(_)
        ));
    }
}
