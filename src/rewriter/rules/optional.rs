//! Adapts calls to host methods that gained optional parameters.

use crate::{
    assembly::{
        codec::{classify_method_invocation, materialize_constant_load},
        Instruction, Operand,
    },
    host::{HostMethod, HostTypeDef},
    metadata::method::MethodBody,
    rewriter::rules::{RewriteContext, RewriteRule, RuleOutcome},
    symbols::{
        matcher::{is_same_type, type_has_matching_method},
        MatchConfidence, MethodRef,
    },
    Result,
};

/// Completes calls compiled against an older, shorter parameter list.
///
/// Compiled code binds to an exact parameter list, so adding an optional parameter to a host
/// method breaks every existing caller. When a reference matches no current overload but
/// its parameters are a prefix of one whose remaining parameters all have defaults, the
/// defaults are pushed in front of the call and the call is retargeted to the full overload.
/// Branches to the call site land on the first injected load.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalParameterRule;

impl OptionalParameterRule {
    /// Creates the rule.
    #[must_use]
    pub fn new() -> Self {
        OptionalParameterRule
    }

    fn find_extended<'a>(definition: &'a HostTypeDef, reference: &MethodRef) -> Option<&'a HostMethod> {
        let candidates = if reference.is_constructor() {
            &definition.constructors
        } else {
            &definition.methods
        };

        candidates.iter().find(|method| {
            method.name == reference.name
                && method.parameters.len() > reference.parameters.len()
                && method.required_parameter_count() <= reference.parameters.len()
                && method
                    .parameters
                    .iter()
                    .zip(&reference.parameters)
                    .all(|(param, ref_param)| is_same_type(&param.ty, ref_param))
        })
    }
}

impl RewriteRule for OptionalParameterRule {
    fn name(&self) -> &'static str {
        "optional-parameters"
    }

    fn handle_instruction(&self, ctx: &RewriteContext<'_>, body: &mut MethodBody, index: usize) -> Result<RuleOutcome> {
        let Some(instruction) = body.instructions.get(index) else {
            return Ok(RuleOutcome::Unchanged);
        };
        let opcode = instruction.opcode;
        let Some(reference) = classify_method_invocation(instruction) else {
            return Ok(RuleOutcome::Unchanged);
        };

        let Some(definition) = ctx.host.find_definition(&reference.declaring_type) else {
            return Ok(RuleOutcome::Unchanged);
        };
        if type_has_matching_method(&definition, reference) {
            return Ok(RuleOutcome::Unchanged);
        }
        let Some(extended) = Self::find_extended(&definition, reference) else {
            return Ok(RuleOutcome::Unchanged);
        };

        let mut loads = Vec::new();
        for param in &extended.parameters[reference.parameters.len()..] {
            let Some(load) = param.default.as_ref().and_then(materialize_constant_load) else {
                return Ok(RuleOutcome::Incompatible(format!(
                    "{reference} lacks parameter '{}' whose default cannot be injected",
                    param.name
                )));
            };
            loads.push(load);
        }

        let mut retargeted = extended.to_method_ref(&definition.ty);
        retargeted.declaring_type = reference.declaring_type.clone();
        retargeted.has_this = reference.has_this;
        retargeted.generic_args.clone_from(&reference.generic_args);
        let call = Instruction::new(opcode, Operand::Method(retargeted))?;

        let injected = loads.len();
        for (offset, load) in loads.into_iter().enumerate() {
            body.insert_before(index + offset, load)?;
        }
        body.replace(index + injected, call)?;
        body.max_stack = body
            .max_stack
            .saturating_add(u16::try_from(injected).unwrap_or(u16::MAX));

        Ok(RuleOutcome::Rewritten {
            span: injected + 1,
            confidence: MatchConfidence::Exact,
        })
    }
}
