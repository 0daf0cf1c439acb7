//! Integration tests for branch widening.
//!
//! Edits grow a body behind a short forward branch until its target no longer fits in a
//! signed byte; the layout must widen the branch and keep it on the same instruction.

use std::sync::Arc;

use cilcompat::{assembly::Immediate, prelude::*};

fn game1() -> HostType {
    HostType::named("StardewValley", "Game1").in_assembly("Stardew Valley")
}

fn play_sound(params: Vec<TypeRef>) -> MethodRef {
    MethodRef::new(game1().to_type_ref(), "playSound", TypeRef::void(), params)
}

fn nops(count: usize) -> Result<Vec<Instruction>> {
    (0..count).map(|_| Instruction::simple(OpCode::NOP)).collect()
}

#[test]
fn insert_widens_short_branch() -> Result<()> {
    let mut instructions = vec![Instruction::new(OpCode::BR_S, Operand::Target(125))?];
    instructions.extend(nops(124)?);
    instructions.push(Instruction::simple(OpCode::RET)?);
    let mut body = MethodBody::new(instructions);

    let stats = body.layout()?;
    assert_eq!(stats.widened, 0);
    assert_eq!(body.instructions[0].opcode, OpCode::BR_S);

    body.insert(1, Instruction::new(OpCode::LDC_I4, Operand::Immediate(Immediate::Int32(7)))?)?;
    let stats = body.layout()?;
    assert_eq!(stats.widened, 1);
    assert_eq!(body.instructions[0].opcode, OpCode::BR);
    assert_eq!(body.instructions[0].operand, Operand::Target(126));
    assert_eq!(body.instructions[126].opcode, OpCode::RET);
    assert_eq!(body.instructions[126].offset, 134);

    let scope = ReferenceScope::new();
    let encoded = body.encode(&scope)?;
    // fat header, then br with a displacement from the end of the branch
    assert_eq!(encoded[12], 0x38);
    assert_eq!(&encoded[13..17], &129_i32.to_le_bytes());

    let decoded = MethodBody::decode(&encoded, &scope)?;
    assert_eq!(decoded.instructions[0].operand, Operand::Target(126));
    Ok(())
}

#[test]
fn injected_default_widens_branch_over_call() -> Result<()> {
    let host = HostApi::new();
    host.register(
        HostTypeDef::new(game1()).method(
            HostMethod::new("playSound", HostType::void())
                .param("cueName", HostType::string())
                .optional_param("pitch", HostType::int32(), HostValue::Int32(1000))
                .static_method(),
        ),
    );
    let rewriter = Rewriter::new(Arc::new(host), Arc::new(FacadeRegistry::new()), RewriteConfig::sequential())
        .with_standard_rules();

    // 117 nops plus ldstr and call put the target exactly at +127
    let mut instructions = vec![Instruction::new(OpCode::BR_S, Operand::Target(120))?];
    instructions.extend(nops(117)?);
    instructions.push(Instruction::new(OpCode::LDSTR, Operand::String("coin".into()))?);
    instructions.push(Instruction::new(OpCode::CALL, Operand::Method(play_sound(vec![TypeRef::string()])))?);
    instructions.push(Instruction::simple(OpCode::RET)?);
    let mut body = MethodBody::new(instructions);

    let report = rewriter.rewrite_body("Mod.Sounds::Play", &mut body)?;
    assert_eq!(report.rewrites, 1);
    assert_eq!(report.widened, 1);
    assert!(report.is_compatible());

    assert_eq!(body.instructions[0].opcode, OpCode::BR);
    assert_eq!(body.instructions[0].operand, Operand::Target(121));
    assert_eq!(body.instructions[119].opcode, OpCode::LDC_I4);
    assert_eq!(
        body.instructions[120].operand,
        Operand::Method(play_sound(vec![TypeRef::string(), TypeRef::int32()]))
    );
    assert_eq!(body.instructions[121].offset, 137);
    assert_eq!(body.max_stack, 9);
    Ok(())
}
