use std::sync::Arc;

use cucumber_steps::{
    registry,
    step::{Flags, StepRegex},
    Arity, Block, Dispatch, Identity, StepDefinition, Value,
};
use serde_json::json;

struct World;

impl Dispatch for World {}

fn definition(regex: StepRegex) -> StepDefinition<World> {
    StepDefinition::block(
        Arc::new(registry::Basic::default()),
        regex,
        Block::new(Arity::Exact(0), |_: &mut World, _| Ok(Value::Nil)),
    )
    .unwrap()
}

#[test]
fn serializes_source_and_flags() {
    let flags = Flags { multiline: true, case_insensitive: true, ..Flags::default() };
    let def = definition(StepRegex::with_flags("foo.*", flags).unwrap());

    let json = serde_json::to_value(def.identity()).unwrap();

    assert_eq!(json, json!({"source": "foo.*", "flags": "mi"}));
}

#[test]
fn deserializes_into_equal_identity() {
    let def = definition(StepRegex::new(r"^I have (\d+) cucumbers$").unwrap());

    let json = serde_json::to_string(&def.identity()).unwrap();
    let id: Identity = serde_json::from_str(&json).unwrap();

    assert_eq!(id, def.identity());
    assert_eq!(id.flags, "");
}
