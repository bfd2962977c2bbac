use std::rc::Rc;

use mixtree_core::{
    AnyValue, Argument, BooleanValue, Collection, Container, FloatValue, IntValue, ItemsDef, Key,
    Node, NodeError, Schema, StringValue,
};
use proptest::prelude::*;

fn strip_schema() -> Rc<Schema> {
    let eq = Schema::builder("eq")
        .property("gain", FloatValue::new)
        .property("q", IntValue::new)
        .build();
    Schema::builder("strip")
        .property("name", StringValue::new)
        .property("fader", FloatValue::new)
        .property("eq", move || Container::new(Rc::clone(&eq)))
        .items(ItemsDef::new(4, |_| IntValue::new()))
        .build()
}

#[derive(Debug, Clone)]
struct StripState {
    name: Option<String>,
    fader: Option<f32>,
    eq_gain: Option<f32>,
    eq_q: Option<i32>,
    sends: Vec<Option<i32>>,
}

fn strip_state() -> impl Strategy<Value = StripState> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(-90.0f32..10.0),
        proptest::option::of(-15.0f32..15.0),
        proptest::option::of(0i32..64),
        proptest::collection::vec(proptest::option::of(any::<i32>()), 4),
    )
        .prop_map(|(name, fader, eq_gain, eq_q, sends)| StripState {
            name,
            fader,
            eq_gain,
            eq_q,
            sends,
        })
}

fn build(state: &StripState) -> Rc<Container> {
    let strip = Rc::new(Container::new(strip_schema()));
    strip
        .get_as::<Rc<StringValue>>("name")
        .unwrap()
        .set(state.name.clone());
    strip.get_as::<Rc<FloatValue>>("fader").unwrap().set(state.fader);
    let eq = strip.get_as::<Rc<Container>>("eq").unwrap();
    eq.get_as::<Rc<FloatValue>>("gain").unwrap().set(state.eq_gain);
    eq.get_as::<Rc<IntValue>>("q").unwrap().set(state.eq_q);
    let sends = Collection::<Rc<IntValue>>::from_container(Rc::clone(&strip)).unwrap();
    for (index, send) in state.sends.iter().enumerate() {
        sends.get(index).unwrap().set(*send);
    }
    strip
}

fn view(container: &Rc<Container>) -> serde_json::Value {
    Node::from(Rc::clone(container)).view()
}

/// An older channel layout and a newer one that appends properties to it.
fn channel_versions() -> (Rc<Schema>, Rc<Schema>) {
    let older = Schema::builder("channel_v1")
        .property("name", StringValue::new)
        .property("fader", FloatValue::new)
        .build();
    let newer = Schema::extend(&older, "channel_v2")
        .property("pan", FloatValue::new)
        .property("mute", BooleanValue::new)
        .build();
    (older, newer)
}

#[test]
fn merge_older_layout_into_newer_keeps_the_extra_properties() {
    let (older, newer) = channel_versions();
    let saved = Container::new(older);
    saved.get_as::<Rc<StringValue>>("name").unwrap().set(Some("Kick".into()));
    saved.get_as::<Rc<FloatValue>>("fader").unwrap().set(Some(-3.0));

    let live = Container::new(newer);
    live.get_as::<Rc<StringValue>>("name").unwrap().set(Some("Snare".into()));
    live.get_as::<Rc<FloatValue>>("pan").unwrap().set(Some(0.25));
    live.get_as::<Rc<BooleanValue>>("mute").unwrap().set(Some(true));

    live.merge(&saved);

    assert_eq!(
        live.get_as::<Rc<StringValue>>("name").unwrap().get().as_deref(),
        Some("Kick")
    );
    assert_eq!(live.get_as::<Rc<FloatValue>>("fader").unwrap().get(), Some(-3.0));
    assert_eq!(live.get_as::<Rc<FloatValue>>("pan").unwrap().get(), Some(0.25));
    assert_eq!(live.get_as::<Rc<BooleanValue>>("mute").unwrap().get(), Some(true));
}

#[test]
fn merge_newer_layout_into_older_copies_the_common_prefix_only() {
    let (older, newer) = channel_versions();
    let saved = Container::new(newer);
    saved.get_as::<Rc<StringValue>>("name").unwrap().set(Some("Kick".into()));
    saved.get_as::<Rc<FloatValue>>("pan").unwrap().set(Some(0.5));
    saved.get_as::<Rc<BooleanValue>>("mute").unwrap().set(Some(true));

    let live = Rc::new(Container::new(older));
    live.get_as::<Rc<FloatValue>>("fader").unwrap().set(Some(1.0));

    live.merge(&saved);

    assert_eq!(
        live.get_as::<Rc<StringValue>>("name").unwrap().get().as_deref(),
        Some("Kick")
    );
    // unset in the source, so the target keeps its own
    assert_eq!(live.get_as::<Rc<FloatValue>>("fader").unwrap().get(), Some(1.0));
    let merged = view(&live);
    let keys: Vec<&String> = merged.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["name", "fader"]);
}

proptest! {
    #[test]
    fn collection_index_round_trips_through_segments(size in 1usize..200, index in 0usize..200) {
        let items = ItemsDef::new(size, |_| IntValue::new());
        let segment = items.format_index(index);
        prop_assert_eq!(items.parse_segment(&segment), Some(index as i64));

        let collection = Collection::<Rc<IntValue>>::with_items("sends", items);
        let by_name = collection.container().get(segment.as_str());
        let by_index = collection.container().get(Key::Index(index));
        if index < size {
            prop_assert_eq!(by_name.unwrap(), by_index.unwrap());
        } else {
            let expected = NodeError::IndexOutOfRange { index: index as i64, size };
            prop_assert_eq!(by_name.unwrap_err(), expected.clone());
            prop_assert_eq!(by_index.unwrap_err(), expected);
        }
    }

    #[test]
    fn padded_segments_parse_back(pad in 0usize..5, base in 0usize..3, index in 0usize..500) {
        let items = ItemsDef::new(500, |_| IntValue::new()).base(base).pad(pad);
        let segment = items.format_index(index);
        prop_assert!(segment.len() >= pad);
        prop_assert_eq!(items.parse_segment(&segment), Some(index as i64));
    }

    #[test]
    fn merge_is_idempotent(source in strip_state(), target in strip_state()) {
        let source = build(&source);
        let target = build(&target);

        target.merge(&source);
        let once = view(&target);
        target.merge(&source);
        prop_assert_eq!(view(&target), once);
    }

    #[test]
    fn merge_copies_every_set_source_value(source in strip_state(), target in strip_state()) {
        let source_tree = build(&source);
        let target_tree = build(&target);
        target_tree.merge(&source_tree);

        let fader = target_tree.get_as::<Rc<FloatValue>>("fader").unwrap().get();
        prop_assert_eq!(fader, source.fader.or(target.fader));
        for (index, send) in source.sends.iter().enumerate() {
            let merged = target_tree.get(index).unwrap();
            let merged = merged.as_value().unwrap();
            match send {
                Some(send) => prop_assert_eq!(merged.to_wire(), Some(Argument::Int(*send))),
                None => prop_assert_eq!(merged.is_set(), target.sends[index].is_some()),
            }
        }
    }
}
