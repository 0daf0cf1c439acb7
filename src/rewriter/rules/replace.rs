//! Retargets references to renamed, moved or reshaped host symbols.

use std::collections::HashMap;

use crate::{
    assembly::{
        codec::{classify_field_access, is_field_store, is_static_field_access},
        Instruction, OpCode, Operand,
    },
    metadata::method::MethodBody,
    rewriter::rules::{RewriteContext, RewriteRule, RuleOutcome},
    symbols::{
        matcher::{is_same_type, match_signature, match_type},
        FieldRef, MatchConfidence, MethodRef, Symbol, TypeRef,
    },
    Result,
};

#[derive(Debug, Clone)]
struct PropertyAccessors {
    getter: Option<MethodRef>,
    setter: Option<MethodRef>,
}

/// Replaces references according to explicit maps and registered facades.
///
/// For every method, field, type or token operand the rule tries, in order:
///
/// 1. a field mapped to a property: the access becomes a call to the accessor
/// 2. a member map entry (old member -> new member)
/// 3. a facade registered for the declaring type that declares the member, or inherits the
///    constructor, being referenced
/// 4. the type map, applied to every type the operand mentions
///
/// Member map entries match on declaring type, name, parameter types and return type.
///
/// # Examples
///
/// ```rust
/// use cilcompat::rewriter::rules::ReplaceReferencesRule;
/// use cilcompat::symbols::TypeRef;
///
/// let rule = ReplaceReferencesRule::new().map_type(
///     &TypeRef::named("StardewValley", "Object"),
///     TypeRef::named("StardewValley", "Item"),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReplaceReferencesRule {
    types: HashMap<String, TypeRef>,
    methods: Vec<(MethodRef, MethodRef)>,
    fields: Vec<(FieldRef, FieldRef)>,
    field_properties: Vec<(FieldRef, PropertyAccessors)>,
}

impl ReplaceReferencesRule {
    /// Creates a rule with empty maps; registered facades still apply.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every mention of type `old` (any instantiation) by `new`.
    ///
    /// Generic arguments of the old reference carry over to the replacement.
    #[must_use]
    pub fn map_type(mut self, old: &TypeRef, new: TypeRef) -> Self {
        if let Some(key) = old.definition_name() {
            self.types.insert(key, new);
        }
        self
    }

    /// Replaces references to method `old` by `new`.
    #[must_use]
    pub fn map_method(mut self, old: MethodRef, new: MethodRef) -> Self {
        self.methods.push((old, new));
        self
    }

    /// Replaces references to field `old` by `new`.
    #[must_use]
    pub fn map_field(mut self, old: FieldRef, new: FieldRef) -> Self {
        self.fields.push((old, new));
        self
    }

    /// Turns accesses to field `old` into calls to the accessors of the property replacing it.
    ///
    /// A missing accessor makes the corresponding access an incompatibility.
    #[must_use]
    pub fn map_field_to_property(mut self, old: FieldRef, getter: Option<MethodRef>, setter: Option<MethodRef>) -> Self {
        self.field_properties.push((old, PropertyAccessors { getter, setter }));
        self
    }

    fn substitute_type(&self, ty: &TypeRef) -> Option<TypeRef> {
        match ty {
            TypeRef::Named(named) => {
                let args: Vec<Option<TypeRef>> = named.generic_args.iter().map(|arg| self.substitute_type(arg)).collect();
                let args_changed = args.iter().any(Option::is_some);
                let replacement = ty.definition_name().and_then(|key| self.types.get(&key));
                if replacement.is_none() && !args_changed {
                    return None;
                }

                let mut result = replacement.cloned().unwrap_or_else(|| ty.clone());
                if let TypeRef::Named(result) = &mut result {
                    if !named.generic_args.is_empty() {
                        result.generic_args = named
                            .generic_args
                            .iter()
                            .zip(args)
                            .map(|(original, mapped)| mapped.unwrap_or_else(|| original.clone()))
                            .collect();
                    }
                }
                Some(result)
            }
            TypeRef::Array { element, rank } => self.substitute_type(element).map(|element| TypeRef::Array {
                element: Box::new(element),
                rank: *rank,
            }),
            TypeRef::ByRef(inner) => self.substitute_type(inner).map(|inner| TypeRef::ByRef(Box::new(inner))),
            TypeRef::Pointer(inner) => self.substitute_type(inner).map(|inner| TypeRef::Pointer(Box::new(inner))),
            TypeRef::GenericParam(_) => None,
        }
    }

    /// Applies the type map to every type in `types`, reporting whether anything changed.
    fn substitute_all(&self, types: &mut [TypeRef]) -> bool {
        let mut changed = false;
        for ty in types {
            if let Some(mapped) = self.substitute_type(ty) {
                *ty = mapped;
                changed = true;
            }
        }
        changed
    }

    fn substitute_method(&self, method: &MethodRef) -> Option<MethodRef> {
        let mut result = method.clone();
        let mut changed = false;
        if let Some(declaring) = self.substitute_type(&method.declaring_type) {
            result.declaring_type = declaring;
            changed = true;
        }
        if let Some(return_type) = self.substitute_type(&method.return_type) {
            result.return_type = return_type;
            changed = true;
        }
        changed |= self.substitute_all(&mut result.parameters);
        changed |= self.substitute_all(&mut result.generic_args);
        changed.then_some(result)
    }

    fn substitute_field(&self, field: &FieldRef) -> Option<FieldRef> {
        let declaring = self.substitute_type(&field.declaring_type);
        let field_type = self.substitute_type(&field.field_type);
        if declaring.is_none() && field_type.is_none() {
            return None;
        }
        Some(FieldRef {
            declaring_type: declaring.unwrap_or_else(|| field.declaring_type.clone()),
            name: field.name.clone(),
            field_type: field_type.unwrap_or_else(|| field.field_type.clone()),
        })
    }

    fn mapped_method(&self, ctx: &RewriteContext<'_>, reference: &MethodRef) -> Option<(MethodRef, MatchConfidence)> {
        self.methods.iter().find_map(|(old, new)| {
            let confidence = match_type(&old.declaring_type, &reference.declaring_type)?
                .min(match_signature(old, reference)?)
                .min(match_type(&old.return_type, &reference.return_type)?);
            if !ctx.accepts(confidence) {
                return None;
            }

            let mut new = new.clone();
            if new.generic_args.is_empty() {
                new.generic_args.clone_from(&reference.generic_args);
            }
            Some((new, confidence))
        })
    }

    fn mapped_field(&self, ctx: &RewriteContext<'_>, old: &FieldRef, reference: &FieldRef) -> Option<MatchConfidence> {
        if old.name != reference.name {
            return None;
        }
        let confidence = match_type(&old.declaring_type, &reference.declaring_type)?
            .min(match_type(&old.field_type, &reference.field_type)?);
        ctx.accepts(confidence).then_some(confidence)
    }

    fn facade_method(ctx: &RewriteContext<'_>, reference: &MethodRef) -> Option<MethodRef> {
        let facade = ctx.facades.for_replaced(&reference.declaring_type)?;
        if !is_same_type(&facade.replaces, &reference.declaring_type) {
            return None;
        }
        let mut retargeted = facade.retarget(reference)?;
        retargeted.generic_args.clone_from(&reference.generic_args);
        Some(retargeted)
    }

    fn handle_method(&self, ctx: &RewriteContext<'_>, opcode: OpCode, reference: &MethodRef) -> Option<(Instruction, MatchConfidence)> {
        let (method, confidence) = self
            .mapped_method(ctx, reference)
            .or_else(|| Self::facade_method(ctx, reference).map(|method| (method, MatchConfidence::Exact)))
            .or_else(|| self.substitute_method(reference).map(|method| (method, MatchConfidence::Exact)))?;
        Some((Instruction::new(opcode, Operand::Method(method)).ok()?, confidence))
    }

    fn handle_field(
        &self,
        ctx: &RewriteContext<'_>,
        instruction: &Instruction,
        reference: &FieldRef,
    ) -> std::result::Result<Option<(Instruction, MatchConfidence)>, String> {
        let opcode = instruction.opcode;
        for (old, accessors) in &self.field_properties {
            let Some(confidence) = self.mapped_field(ctx, old, reference) else {
                continue;
            };

            if classify_field_access(instruction).is_none() {
                return Err(format!("{reference} is now a property and has no address"));
            }
            let (accessor, kind) = if is_field_store(opcode) {
                (&accessors.setter, "written")
            } else {
                (&accessors.getter, "read")
            };
            let Some(accessor) = accessor else {
                return Err(format!("{reference} is now a property that cannot be {kind}"));
            };

            let call = if is_static_field_access(opcode) {
                OpCode::CALL
            } else {
                OpCode::CALLVIRT
            };
            return Ok(Instruction::new(call, Operand::Method(accessor.clone()))
                .ok()
                .map(|instruction| (instruction, confidence)));
        }

        let mapped = self
            .fields
            .iter()
            .find_map(|(old, new)| self.mapped_field(ctx, old, reference).map(|confidence| (new.clone(), confidence)))
            .or_else(|| self.substitute_field(reference).map(|field| (field, MatchConfidence::Exact)));
        Ok(mapped.and_then(|(field, confidence)| {
            Instruction::new(opcode, Operand::Field(field))
                .ok()
                .map(|instruction| (instruction, confidence))
        }))
    }

    fn handle_symbol(&self, ctx: &RewriteContext<'_>, symbol: &Symbol) -> Option<(Symbol, MatchConfidence)> {
        match symbol {
            Symbol::Type(ty) => self.substitute_type(ty).map(|ty| (Symbol::Type(ty), MatchConfidence::Exact)),
            Symbol::Method(method) => self
                .mapped_method(ctx, method)
                .or_else(|| self.substitute_method(method).map(|method| (method, MatchConfidence::Exact)))
                .map(|(method, confidence)| (Symbol::Method(method), confidence)),
            Symbol::Field(field) => self
                .fields
                .iter()
                .find_map(|(old, new)| self.mapped_field(ctx, old, field).map(|confidence| (new.clone(), confidence)))
                .or_else(|| self.substitute_field(field).map(|field| (field, MatchConfidence::Exact)))
                .map(|(field, confidence)| (Symbol::Field(field), confidence)),
        }
    }
}

impl RewriteRule for ReplaceReferencesRule {
    fn name(&self) -> &'static str {
        "replace-references"
    }

    fn handle_instruction(&self, ctx: &RewriteContext<'_>, body: &mut MethodBody, index: usize) -> Result<RuleOutcome> {
        let Some(instruction) = body.instructions.get(index) else {
            return Ok(RuleOutcome::Unchanged);
        };
        let opcode = instruction.opcode;

        let replacement = match &instruction.operand {
            Operand::Method(method) => self.handle_method(ctx, opcode, method),
            Operand::Field(field) => match self.handle_field(ctx, instruction, field) {
                Ok(replacement) => replacement,
                Err(reason) => return Ok(RuleOutcome::Incompatible(reason)),
            },
            Operand::Type(ty) => self
                .substitute_type(ty)
                .and_then(|ty| Instruction::new(opcode, Operand::Type(ty)).ok())
                .map(|instruction| (instruction, MatchConfidence::Exact)),
            Operand::Symbol(symbol) => self.handle_symbol(ctx, symbol).and_then(|(symbol, confidence)| {
                Instruction::new(opcode, Operand::Symbol(symbol))
                    .ok()
                    .map(|instruction| (instruction, confidence))
            }),
            _ => None,
        };

        let Some((replacement, confidence)) = replacement else {
            return Ok(RuleOutcome::Unchanged);
        };
        body.replace(index, replacement)?;
        Ok(RuleOutcome::Rewritten { span: 1, confidence })
    }
}
