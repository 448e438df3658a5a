use hookflow_core::value::render;
use serde_json::Value;

use super::{Helper, HelperTable};
use crate::eval::eval_str;

pub fn register(table: &mut HelperTable) {
    table.register(Helper::new("solve", solve));
}

fn solve(arg: Option<&Value>) -> Value {
    let Some(arg) = arg else {
        return Value::String(String::new());
    };
    let source = render(arg);
    match eval_str(&source) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(expression = %source, error = %e, "solve failed");
            Value::String(String::new())
        }
    }
}
