//! The rewrite pipeline: runs the configured rules over method bodies and relays them out.

use std::{fmt, sync::Arc};

use rayon::prelude::*;

use crate::{
    facades::FacadeRegistry,
    host::HostApi,
    metadata::{
        method::MethodBody,
        scope::{SymbolEmitter, SymbolResolver},
        token::Token,
    },
    rewriter::{
        rules::{
            BrokenReferenceRule, ConstantFieldRule, OptionalParameterRule, ReplaceReferencesRule, RewriteContext,
            RewriteRule, RuleOutcome,
        },
        MethodReport, RewriteConfig, RewriteReport,
    },
    Error, Result,
};

/// An encoded method body as stored in a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMethod {
    /// Display name used in reports and logs
    pub name: String,
    /// `MethodDef` token of the method
    pub token: Token,
    /// Method body bytes, header and exception sections included
    pub body: Vec<u8>,
}

impl RawMethod {
    /// Creates a raw method.
    #[must_use]
    pub fn new(name: &str, token: Token, body: Vec<u8>) -> Self {
        RawMethod {
            name: name.to_string(),
            token,
            body,
        }
    }
}

/// Rewrites method bodies of a mod binary against the live host API.
///
/// Every instruction is offered to the rules in registration order; the first rule that does
/// not answer [`RuleOutcome::Unchanged`] claims it, and scanning resumes after the span the
/// rule reported. Bodies a rule touched are relaid out afterwards, widening short branches
/// where the edits pushed targets out of range.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use cilcompat::prelude::*;
///
/// let rewriter = Rewriter::new(
///     Arc::new(cilcompat::host::world::game_api()),
///     Arc::new(FacadeRegistry::with_builtin()),
///     RewriteConfig::default(),
/// )
/// .with_standard_rules();
///
/// let mut body = MethodBody::new(vec![Instruction::simple(OpCode::RET)?]);
/// let report = rewriter.rewrite_body("Mod.Entry::Tick", &mut body)?;
/// assert!(!report.is_modified());
/// # Ok::<(), cilcompat::Error>(())
/// ```
pub struct Rewriter {
    rules: Vec<Box<dyn RewriteRule>>,
    host: Arc<HostApi>,
    facades: Arc<FacadeRegistry>,
    config: RewriteConfig,
}

impl Rewriter {
    /// Creates a rewriter without rules.
    #[must_use]
    pub fn new(host: Arc<HostApi>, facades: Arc<FacadeRegistry>, config: RewriteConfig) -> Self {
        Rewriter {
            rules: Vec::new(),
            host,
            facades,
            config,
        }
    }

    /// Appends a rule. Rules registered earlier take precedence.
    #[must_use]
    pub fn with_rule<R: RewriteRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Appends the stock rules: facade redirection, literal inlining, optional parameter
    /// completion, and finally broken reference detection.
    ///
    /// Rules added after this call only see what broken reference detection let pass, which
    /// is every instruction, since that rule never claims a reference it can resolve.
    #[must_use]
    pub fn with_standard_rules(self) -> Self {
        self.with_rule(ReplaceReferencesRule::new())
            .with_rule(ConstantFieldRule::new())
            .with_rule(OptionalParameterRule::new())
            .with_rule(BrokenReferenceRule::new())
    }

    /// Names of the registered rules, in order.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    fn context(&self) -> RewriteContext<'_> {
        RewriteContext {
            host: &self.host,
            facades: &self.facades,
            config: &self.config,
        }
    }

    /// Runs every rule over `body` and relays it out if anything changed.
    ///
    /// Incompatibilities are collected in the returned report; this method does not apply
    /// [`RewriteConfig::reject_on_incompatible`], which is a property of a whole binary.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if the body is invalid (when validation is
    /// enabled), a rule cannot edit it, or the final layout fails.
    pub fn rewrite_body(&self, name: &str, body: &mut MethodBody) -> Result<MethodReport> {
        if self.config.validate_before_rewrite {
            body.validate()?;
        }

        let ctx = self.context();
        let mut report = MethodReport::new(name);
        let mut index = 0;
        while index < body.instructions.len() {
            let mut step = 1;
            for rule in &self.rules {
                match rule.handle_instruction(&ctx, body, index)? {
                    RuleOutcome::Unchanged => continue,
                    RuleOutcome::Rewritten { span, confidence } => {
                        log::debug!("{name}: {} rewrote instruction {index}", rule.name());
                        report.record_rewrite(index, rule.name(), confidence);
                        step = span.max(1);
                    }
                    RuleOutcome::Incompatible(reason) => {
                        log::warn!("{name}: {} at instruction {index}: {reason}", rule.name());
                        report.record_incompatibility(index, rule.name(), reason);
                    }
                }
                break;
            }
            index += step;
        }

        if report.is_modified() {
            let stats = body.layout()?;
            log::trace!(
                "{name}: relaid out to {} bytes in {} passes, {} branches widened",
                stats.code_size,
                stats.passes,
                stats.widened
            );
            report.widened = stats.widened;
        }
        Ok(report)
    }

    /// Rewrites a set of named bodies, in parallel when configured.
    ///
    /// # Errors
    /// Fails like [`Rewriter::rewrite_body`] on the first defective body, or with
    /// [`crate::Error::Incompatible`] if references stay broken and the configuration rejects
    /// incompatible binaries.
    pub fn rewrite_bodies(&self, bodies: &mut [(String, MethodBody)]) -> Result<RewriteReport> {
        let methods = self.rewrite_all(bodies)?;
        self.check(RewriteReport { methods })
    }

    /// Decodes, rewrites and re-encodes the method bodies of one binary.
    ///
    /// Bodies no rule touched are returned byte for byte. Tokens for references the rules
    /// introduced are obtained from `emitter`.
    ///
    /// # Errors
    /// Returns a decoding error for malformed bodies, [`crate::Error::StructuralDefect`] if a
    /// body cannot be rewritten or encoded, and [`crate::Error::Incompatible`] as described in
    /// [`Rewriter::rewrite_bodies`].
    pub fn rewrite_binary(
        &self,
        methods: &[RawMethod],
        resolver: &dyn SymbolResolver,
        emitter: &dyn SymbolEmitter,
    ) -> Result<(Vec<RawMethod>, RewriteReport)> {
        let decode = |method: &RawMethod| -> Result<(String, MethodBody)> {
            let body = MethodBody::decode(&method.body, resolver)?;
            Ok((method.name.clone(), body))
        };
        let mut bodies: Vec<(String, MethodBody)> = if self.config.parallel {
            methods.par_iter().map(decode).collect::<Result<_>>()?
        } else {
            methods.iter().map(decode).collect::<Result<_>>()?
        };

        let reports = self.rewrite_all(&mut bodies)?;

        let mut rewritten = Vec::with_capacity(methods.len());
        for ((method, (_, body)), report) in methods.iter().zip(&bodies).zip(&reports) {
            let bytes = if report.is_modified() {
                body.encode(emitter)?
            } else {
                method.body.clone()
            };
            rewritten.push(RawMethod {
                name: method.name.clone(),
                token: method.token,
                body: bytes,
            });
        }

        let report = self.check(RewriteReport { methods: reports })?;
        Ok((rewritten, report))
    }

    fn rewrite_all(&self, bodies: &mut [(String, MethodBody)]) -> Result<Vec<MethodReport>> {
        if self.config.parallel {
            bodies
                .par_iter_mut()
                .map(|(name, body)| self.rewrite_body(name, body))
                .collect()
        } else {
            bodies
                .iter_mut()
                .map(|(name, body)| self.rewrite_body(name, body))
                .collect()
        }
    }

    fn check(&self, report: RewriteReport) -> Result<RewriteReport> {
        if self.config.reject_on_incompatible && !report.is_compatible() {
            return Err(Error::Incompatible(report.to_string()));
        }
        Ok(report)
    }
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewriter")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .field("host", &self.host.len())
            .field("facades", &self.facades.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{Instruction, OpCode, Operand},
        host::{
            world::{game_api, world_date_type, GAME_ASSEMBLY, GAME_NAMESPACE},
            HostApi, HostField, HostType, HostTypeDef, HostValue,
        },
        metadata::scope::ReferenceScope,
        symbols::{FieldRef, MethodRef, Symbol, TypeRef},
    };

    fn rewriter(config: RewriteConfig) -> Rewriter {
        Rewriter::new(Arc::new(game_api()), Arc::new(FacadeRegistry::with_builtin()), config).with_standard_rules()
    }

    fn legacy_season_read() -> MethodBody {
        let date = world_date_type().to_type_ref();
        MethodBody::new(vec![
            Instruction::new(OpCode::NEWOBJ, Operand::Method(MethodRef::constructor(date.clone(), vec![]))).unwrap(),
            Instruction::new(
                OpCode::CALLVIRT,
                Operand::Method(MethodRef::new(date, "get_Season", TypeRef::string(), vec![]).instance()),
            )
            .unwrap(),
            Instruction::simple(OpCode::POP).unwrap(),
            Instruction::simple(OpCode::RET).unwrap(),
        ])
    }

    #[test]
    fn rule_order() {
        let rewriter = rewriter(RewriteConfig::default());
        assert_eq!(
            rewriter.rule_names().collect::<Vec<_>>(),
            ["replace-references", "constant-fields", "optional-parameters", "broken-references"]
        );
    }

    #[test]
    fn rewrite_body_redirects_to_facade() {
        let rewriter = rewriter(RewriteConfig::sequential());
        let mut body = legacy_season_read();

        let report = rewriter.rewrite_body("Mod::Entry", &mut body).unwrap();
        assert_eq!(report.rewrites, 2);
        assert!(report.is_compatible());
        assert_eq!(body.instructions[0].offset, 0);
        assert_eq!(body.instructions[1].offset, 5);

        for instruction in &body.instructions[..2] {
            let Operand::Method(method) = &instruction.operand else {
                panic!("operand kind changed");
            };
            assert_eq!(method.declaring_type.to_string(), "CilCompat.Facades.WorldDateFacade");
        }
    }

    #[test]
    fn incompatibility_rejects_or_reports() {
        let coop = TypeRef::named(GAME_NAMESPACE, "Coop").with_scope(GAME_ASSEMBLY);
        let bodies = || {
            vec![
                ("Mod::Good".to_string(), legacy_season_read()),
                (
                    "Mod::Bad".to_string(),
                    MethodBody::new(vec![
                        Instruction::simple(OpCode::LDNULL).unwrap(),
                        Instruction::new(OpCode::CASTCLASS, Operand::Type(coop.clone())).unwrap(),
                        Instruction::simple(OpCode::RET).unwrap(),
                    ]),
                ),
            ]
        };

        let strict = rewriter(RewriteConfig::strict());
        assert!(matches!(strict.rewrite_bodies(&mut bodies()), Err(Error::Incompatible(_))));

        let lenient = rewriter(RewriteConfig::lenient());
        let report = lenient.rewrite_bodies(&mut bodies()).unwrap();
        assert_eq!(report.methods.len(), 2);
        assert_eq!(report.modified_methods(), 1);
        let broken: Vec<_> = report.incompatibilities().collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].method, "Mod::Bad");
        assert_eq!(broken[0].index, 1);
        assert_eq!(broken[0].rule, "broken-references");
    }

    #[test]
    fn mistyped_constant_read_is_reported_not_inlined() {
        let game1 = HostType::named(GAME_NAMESPACE, "Game1").in_assembly(GAME_ASSEMBLY);
        let host = HostApi::new();
        let mut tile_size = HostField::new("tileSize", HostType::int32()).static_field();
        tile_size.constant = Some(HostValue::Int32(64));
        host.register(HostTypeDef::new(game1.clone()).field(tile_size));
        let rewriter = Rewriter::new(Arc::new(host), Arc::new(FacadeRegistry::new()), RewriteConfig::lenient())
            .with_standard_rules();

        let read = FieldRef::new(game1.to_type_ref(), "tileSize", TypeRef::string());
        let mut bodies = vec![(
            "Mod::Tiles".to_string(),
            MethodBody::new(vec![
                Instruction::new(OpCode::LDSFLD, Operand::Field(read)).unwrap(),
                Instruction::simple(OpCode::RET).unwrap(),
            ]),
        )];

        let report = rewriter.rewrite_bodies(&mut bodies).unwrap();
        assert_eq!(report.rewrites(), 0);
        assert_eq!(bodies[0].1.instructions[0].opcode, OpCode::LDSFLD);
        let broken: Vec<_> = report.incompatibilities().collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].rule, "broken-references");
        assert!(broken[0].reason.contains("now of type"));
    }

    #[test]
    fn invalid_body_fails_validation() {
        let rewriter = rewriter(RewriteConfig::default());
        let mut body = MethodBody::new(vec![Instruction::new(OpCode::BR_S, Operand::Target(7)).unwrap()]);
        assert!(matches!(
            rewriter.rewrite_body("Mod::Broken", &mut body),
            Err(Error::StructuralDefect(_))
        ));
    }

    #[test]
    fn rewrite_binary_keeps_untouched_bodies() {
        let scope = ReferenceScope::new();
        let date = world_date_type().to_type_ref();
        let ctor = scope.intern(&Symbol::Method(MethodRef::constructor(date, vec![])));
        let ctor = ctor.value().to_le_bytes();

        let untouched = RawMethod::new("Mod::Nop", Token::new(0x0600_0001), vec![0x0A, 0x00, 0x2A]);
        let legacy = RawMethod::new(
            "Mod::Date",
            Token::new(0x0600_0002),
            vec![0x1E, 0x73, ctor[0], ctor[1], ctor[2], ctor[3], 0x26, 0x2A],
        );

        let rewriter = rewriter(RewriteConfig::default());
        let (methods, report) = rewriter
            .rewrite_binary(&[untouched.clone(), legacy.clone()], &scope, &scope)
            .unwrap();

        assert_eq!(methods[0], untouched);
        assert_eq!(methods[1].token, legacy.token);
        assert_ne!(methods[1].body, legacy.body);
        assert_eq!(report.rewrites(), 1);

        let body = MethodBody::decode(&methods[1].body, &scope).unwrap();
        let Operand::Method(method) = &body.instructions[0].operand else {
            panic!("constructor lost");
        };
        assert_eq!(method.declaring_type.to_string(), "CilCompat.Facades.WorldDateFacade");
    }
}
