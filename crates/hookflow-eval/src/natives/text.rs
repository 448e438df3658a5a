use hookflow_core::value::render;
use serde_json::{json, Value};

use super::{Helper, HelperTable};

pub fn register(table: &mut HelperTable) {
    table.register(Helper::new("charCount", char_count));
}

fn char_count(arg: Option<&Value>) -> Value {
    match arg {
        Some(value) if !value.is_null() => json!(render(value).chars().count()),
        _ => Value::String(String::new()),
    }
}
