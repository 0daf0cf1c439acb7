//! Integration tests for facade redirection.
//!
//! A mod compiled against the old `WorldDate` reads `Season` as a string. The rewriter either
//! sends such reads to the `WorldDateFacade` or maps them straight onto `SeasonKey`; both paths
//! must observe the same value on the live object.

use std::sync::Arc;

use cilcompat::{
    facades::WorldDateFacade,
    host::world::{game_api, world_date_type, WorldDate},
    prelude::*,
    symbols::matcher::type_has_matching_method,
};

fn date() -> TypeRef {
    world_date_type().to_type_ref()
}

fn legacy_season_getter() -> MethodRef {
    MethodRef::new(date(), "get_Season", TypeRef::string(), vec![]).instance()
}

fn method_at(body: &MethodBody, index: usize) -> &MethodRef {
    match &body.instructions[index].operand {
        Operand::Method(method) => method,
        other => panic!("expected a method operand, found {other:?}"),
    }
}

#[test]
fn constructor_redirect_and_declared_constructor_fault() -> Result<()> {
    let facades = Arc::new(FacadeRegistry::with_builtin());
    let rewriter = Rewriter::new(Arc::new(game_api()), Arc::clone(&facades), RewriteConfig::default())
        .with_standard_rules();

    let mut body = MethodBody::new(vec![
        Instruction::simple(OpCode::LDC_I4_3)?,
        Instruction::new(OpCode::LDSTR, Operand::String("summer".into()))?,
        Instruction::new(OpCode::LDC_I4_S, Operand::Immediate(cilcompat::assembly::Immediate::Int8(9)))?,
        Instruction::new(
            OpCode::NEWOBJ,
            Operand::Method(MethodRef::constructor(
                date(),
                vec![TypeRef::int32(), TypeRef::string(), TypeRef::int32()],
            )),
        )?,
        Instruction::simple(OpCode::RET)?,
    ]);
    let report = rewriter.rewrite_body("Mod.Calendar::Create", &mut body)?;
    assert_eq!(report.rewrites, 1);

    let ctor = method_at(&body, 3);
    assert_eq!(ctor.declaring_type.to_string(), "CilCompat.Facades.WorldDateFacade");
    assert!(ctor.is_constructor());

    // the redirected constructor builds the base and hands back the facade
    let instance = facades.invoke_constructor(ctor, &[HostValue::Int32(3), "summer".into(), HostValue::Int32(9)])?;
    let Ok(facade) = instance.downcast::<WorldDateFacade>() else {
        panic!("constructor produced something other than the facade");
    };
    assert_eq!(facade.base().year(), 3);
    assert_eq!(facade.base().day_of_month(), 9);

    // the facade's own constructor is never meant to run
    assert!(matches!(WorldDateFacade::new(), Err(Error::FacadeConstructed("WorldDateFacade"))));
    let facade_type = facades.for_replaced(&date()).map(|facade| facade.construct_declared());
    assert!(matches!(facade_type, Some(Err(Error::FacadeConstructed(_)))));
    Ok(())
}

#[test]
fn legacy_season_read_through_facade() -> Result<()> {
    let facades = Arc::new(FacadeRegistry::with_builtin());
    let rewriter = Rewriter::new(Arc::new(game_api()), Arc::clone(&facades), RewriteConfig::default())
        .with_standard_rules();

    let mut body = MethodBody::new(vec![
        Instruction::simple(OpCode::LDARG_0)?,
        Instruction::new(OpCode::CALLVIRT, Operand::Method(legacy_season_getter()))?,
        Instruction::simple(OpCode::RET)?,
    ]);
    let report = rewriter.rewrite_body("Mod.Calendar::Season", &mut body)?;
    assert_eq!(report.rewrites, 1);

    let getter = method_at(&body, 1);
    assert_eq!(getter.declaring_type.to_string(), "CilCompat.Facades.WorldDateFacade");
    assert_eq!(getter.return_type, TypeRef::string());

    // the receiver is still the live object the game hands out
    let mut live = WorldDate::new(1, "summer", 14);
    assert_eq!(facades.invoke(getter, &mut live, &[])?, Some(HostValue::from("summer")));
    Ok(())
}

#[test]
fn legacy_season_read_mapped_to_season_key() -> Result<()> {
    let host = Arc::new(game_api());
    let season_key = MethodRef::new(date(), "get_SeasonKey", TypeRef::string(), vec![]).instance();
    let rewriter = Rewriter::new(Arc::clone(&host), Arc::new(FacadeRegistry::new()), RewriteConfig::default())
        .with_rule(ReplaceReferencesRule::new().map_method(legacy_season_getter(), season_key.clone()))
        .with_rule(BrokenReferenceRule::new());

    let mut body = MethodBody::new(vec![
        Instruction::simple(OpCode::LDARG_0)?,
        Instruction::new(OpCode::CALLVIRT, Operand::Method(legacy_season_getter()))?,
        Instruction::simple(OpCode::RET)?,
    ]);
    let report = rewriter.rewrite_body("Mod.Calendar::Season", &mut body)?;
    assert_eq!(report.rewrites, 1);
    assert!(report.is_compatible());

    let getter = method_at(&body, 1);
    assert_eq!(getter, &season_key);
    let Some(definition) = host.find_definition(&getter.declaring_type) else {
        panic!("WorldDate is not registered");
    };
    assert!(type_has_matching_method(&definition, getter));

    // both paths read the same live object
    let facades = FacadeRegistry::with_builtin();
    let Some(legacy) = facades
        .for_replaced(&date())
        .and_then(|facade| facade.retarget(&legacy_season_getter()))
    else {
        panic!("no facade member for the legacy getter");
    };
    let mut live = WorldDate::new(1, "summer", 14);
    let through_facade = facades.invoke(&legacy, &mut live, &[])?;
    let through_season_key = HostValue::from(live.season_key());
    assert_eq!(through_facade, Some(through_season_key.clone()));
    assert_eq!(through_season_key, HostValue::from("summer"));
    Ok(())
}

#[test]
fn unmapped_legacy_read_is_reported() {
    let rewriter = Rewriter::new(Arc::new(game_api()), Arc::new(FacadeRegistry::new()), RewriteConfig::default())
        .with_standard_rules();

    let mut bodies = vec![(
        "Mod.Calendar::Season".to_string(),
        MethodBody::new(vec![
            Instruction::simple(OpCode::LDARG_0).unwrap(),
            Instruction::new(OpCode::CALLVIRT, Operand::Method(legacy_season_getter())).unwrap(),
            Instruction::simple(OpCode::RET).unwrap(),
        ]),
    )];

    let Err(Error::Incompatible(summary)) = rewriter.rewrite_bodies(&mut bodies) else {
        panic!("broken reference was not rejected");
    };
    assert!(summary.contains("Mod.Calendar::Season #1 (broken-references)"));
}
