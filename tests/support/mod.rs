use redux_store::{reducer_fn, Reducer};
use serde_json::{json, Value};

pub fn initial_state() -> Value {
    json!({
        "variable1": 5,
        "variable2": "this is a string",
        "variable3": {
            "prop1": 1,
            "prop2": "this is another string"
        }
    })
}

/// Application-style root reducer: a couple of recognized action types,
/// everything else passes the state through unchanged.
pub fn root_reducer() -> Reducer {
    reducer_fn(|state, action| {
        let current = state.cloned().unwrap_or_else(initial_state);
        match action["type"].as_str() {
            Some("CHANGE_VARIABLE_1") => {
                let mut next = current;
                next["variable1"] = action["variable1"].clone();
                next
            }
            Some("REPLACE_STATE") => action["state"].clone(),
            _ => current,
        }
    })
}

pub fn change_variable_1(value: i64) -> Value {
    json!({ "type": "CHANGE_VARIABLE_1", "variable1": value })
}
