use crate::{
    assembly::{Instruction, OpCode, Operand},
    facades::FacadeRegistry,
    host::HostApi,
    metadata::method::MethodBody,
    rewriter::{RewriteConfig, RewriteContext},
};

/// Context over the given host, facades and configuration.
pub(crate) fn ctx<'a>(host: &'a HostApi, facades: &'a FacadeRegistry, config: &'a RewriteConfig) -> RewriteContext<'a> {
    RewriteContext { host, facades, config }
}

/// A body holding one instruction followed by `ret`.
pub(crate) fn single(opcode: OpCode, operand: Operand) -> MethodBody {
    MethodBody::new(vec![
        Instruction::new(opcode, operand).unwrap(),
        Instruction::simple(OpCode::RET).unwrap(),
    ])
}
