//! Replaces reads of fields that no longer have storage with their value.

use crate::{
    assembly::{
        codec::{classify_field_access, is_field_store, is_static_field_access, materialize_constant_load},
        Operand,
    },
    host::HostValue,
    metadata::method::MethodBody,
    rewriter::rules::{RewriteContext, RewriteRule, RuleOutcome},
    symbols::{
        matcher::{is_same_type, is_same_type_ref},
        FieldRef,
    },
    Result,
};

/// Inlines static fields that were removed or turned into literals.
///
/// A field with an explicit value registered through [`ConstantFieldRule::constant`] is
/// inlined wherever it is read. Static fields of the host API declared with a constant
/// value are inlined as well: literal fields have no storage, so an `ldsfld` on them fails
/// at runtime. Writes and address loads cannot be adapted and are reported. A host literal
/// whose type differs from the compiled reference is left to [`BrokenReferenceRule`].
///
/// [`BrokenReferenceRule`]: crate::rewriter::rules::BrokenReferenceRule
#[derive(Debug, Clone, Default)]
pub struct ConstantFieldRule {
    constants: Vec<(FieldRef, HostValue)>,
}

impl ConstantFieldRule {
    /// Creates a rule that only inlines host literal fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inlines reads of the static field `field` as `value`.
    #[must_use]
    pub fn constant(mut self, field: FieldRef, value: HostValue) -> Self {
        self.constants.push((field, value));
        self
    }

    fn value_of(&self, ctx: &RewriteContext<'_>, reference: &FieldRef) -> Option<HostValue> {
        let registered = self.constants.iter().find(|(field, _)| {
            field.name == reference.name
                && is_same_type_ref(&field.declaring_type, &reference.declaring_type)
                && is_same_type_ref(&field.field_type, &reference.field_type)
        });
        if let Some((_, value)) = registered {
            return Some(value.clone());
        }

        let definition = ctx.host.find_definition(&reference.declaring_type)?;
        let field = definition.find_field(&reference.name)?;
        if field.is_static && is_same_type(&field.field_type, &reference.field_type) {
            field.constant.clone()
        } else {
            None
        }
    }
}

impl RewriteRule for ConstantFieldRule {
    fn name(&self) -> &'static str {
        "constant-fields"
    }

    fn handle_instruction(&self, ctx: &RewriteContext<'_>, body: &mut MethodBody, index: usize) -> Result<RuleOutcome> {
        let Some(instruction) = body.instructions.get(index) else {
            return Ok(RuleOutcome::Unchanged);
        };
        let Operand::Field(field) = &instruction.operand else {
            return Ok(RuleOutcome::Unchanged);
        };
        if !is_static_field_access(instruction.opcode) {
            return Ok(RuleOutcome::Unchanged);
        }
        let Some(value) = self.value_of(ctx, field) else {
            return Ok(RuleOutcome::Unchanged);
        };

        // ldsflda is not a field access in the codec's sense
        if classify_field_access(instruction).is_none() || is_field_store(instruction.opcode) {
            return Ok(RuleOutcome::Incompatible(format!(
                "{field} is a constant and cannot be written or have its address taken"
            )));
        }
        let Some(load) = materialize_constant_load(&value) else {
            return Ok(RuleOutcome::Incompatible(format!(
                "{field} has a {} value, which cannot be inlined",
                value.kind_name()
            )));
        };

        body.replace(index, load)?;
        Ok(RuleOutcome::rewritten())
    }
}
