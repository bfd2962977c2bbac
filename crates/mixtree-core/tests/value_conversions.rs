use std::rc::Rc;

use mixtree_core::{
    AnyValue, Argument, Container, EnumDef, EnumValue, IntValue, Node, Root, ScaledValue, Schema,
};

fn console() -> Root {
    let on_off = Rc::new(EnumDef::new(["OFF", "ON"]));
    let mix = Schema::builder("mix")
        .enumeration("on", on_off)
        .linear("fader", 0.0, 100.0, 128)
        .property("level", || IntValue::new().nullable())
        .callable(true)
        .build();
    Root::new(
        Schema::builder("console")
            .property("mix", move || Container::new(Rc::clone(&mix)))
            .build(),
    )
}

fn call(root: &Root, address: &str, args: &[Argument]) -> Option<Vec<Argument>> {
    root.lookup(address)
        .expect("lookup must succeed")
        .handle_call(None, args)
        .expect("call must succeed")
}

#[test]
fn enum_accepts_names_and_codes_and_emits_codes() {
    let root = console();
    call(&root, "/mix/on", &[Argument::from("ON")]);
    let on = root.lookup_as::<Rc<EnumValue>>("/mix/on").unwrap();
    assert_eq!(on.get(), Some(1));
    assert_eq!(call(&root, "/mix/on", &[]), Some(vec![Argument::Int(1)]));

    call(&root, "/mix/on", &[Argument::Int(0)]);
    assert_eq!(on.name().as_deref(), Some("OFF"));

    call(&root, "/mix/on", &[Argument::from("MAYBE")]);
    assert_eq!(on.get(), Some(0));
}

#[test]
fn scaled_value_reads_integers_as_steps_and_floats_as_raw() {
    let root = console();
    call(&root, "/mix/fader", &[Argument::Int(64)]);
    let fader = root.lookup_as::<Rc<ScaledValue>>("/mix/fader").unwrap();
    let raw = fader.get().unwrap();
    assert!((raw - 50.39).abs() < 0.01, "raw = {raw}");
    assert_eq!(fader.to_string(), "50.39 (64)");

    call(&root, "/mix/fader", &[Argument::Float(50.0)]);
    assert_eq!(fader.get(), Some(50.0));
    assert_eq!(call(&root, "/mix/fader", &[]), Some(vec![Argument::Float(50.0)]));
}

#[test]
fn nullable_value_round_trips_the_null_sentinel() {
    let root = console();
    assert_eq!(call(&root, "/mix/level", &[]), Some(vec![Argument::Null]));
    call(&root, "/mix/level", &[Argument::Int(-12)]);
    assert_eq!(call(&root, "/mix/level", &[]), Some(vec![Argument::Int(-12)]));
    call(&root, "/mix/level", &[Argument::Null]);
    let level = root.lookup("/mix/level").unwrap();
    assert!(!level.as_value().unwrap().is_set());
}

#[test]
fn container_answer_includes_null_sentinel_of_unset_nullable() {
    let root = console();
    call(&root, "/mix", &[Argument::from("ON"), Argument::Float(12.5)]);
    assert_eq!(
        call(&root, "/mix", &[]),
        Some(vec![Argument::Int(1), Argument::Float(12.5), Argument::Null])
    );
}

#[test]
fn wrong_typed_access_reports_expected_type() {
    let root = console();
    let err = root.lookup_as::<Rc<IntValue>>("/mix/fader").err().unwrap();
    assert_eq!(err.to_string(), "value at '/mix/fader' does not hold integer");
    assert!(root.lookup_as::<Rc<Container>>("/mix/fader").is_err());
    assert!(matches!(root.lookup("/mix").unwrap(), Node::Container(_)));
}

#[test]
fn enum_with_renamed_variant_uses_the_wire_name() {
    let mode = Rc::new(EnumDef::with_names(
        ["off", "on", "auto"],
        [("auto", "AUTO-ON")],
    ));
    let value = EnumValue::enumerated(mode);

    value.handle_call(None, Some(&Argument::from("AUTO-ON")));
    assert_eq!(value.get(), Some(2));
    assert_eq!(value.name().as_deref(), Some("AUTO-ON"));
    assert_eq!(value.to_wire(), Some(Argument::Int(2)));

    value.handle_call(None, Some(&Argument::from("auto")));
    assert_eq!(value.get(), Some(2));
}
