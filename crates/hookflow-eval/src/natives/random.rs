use hookflow_core::value::as_number;
use rand::Rng;
use serde_json::{json, Value};

use super::{Helper, HelperTable};

const MAX: i64 = 100;

pub fn register(table: &mut HelperTable) {
    table.register(Helper::new("random_number", random_number));
}

/// Integer in `[min, 100]`; `min` comes from the argument and defaults to 0.
fn random_number(arg: Option<&Value>) -> Value {
    let min = arg.and_then(as_number).map(|n| n.floor() as i64).unwrap_or(0);
    let (low, high) = if min > MAX { (MAX, min) } else { (min, MAX) };
    json!(rand::thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        for _ in 0..50 {
            let n = random_number(None).as_i64().unwrap();
            assert!((0..=100).contains(&n));
        }
    }

    #[test]
    fn test_min_from_argument() {
        for _ in 0..50 {
            let n = random_number(Some(&json!("90"))).as_i64().unwrap();
            assert!((90..=100).contains(&n));
        }
        let n = random_number(Some(&json!(150))).as_i64().unwrap();
        assert!((100..=150).contains(&n));
    }

    #[test]
    fn test_non_numeric_argument_uses_default() {
        let n = random_number(Some(&json!("abc"))).as_i64().unwrap();
        assert!((0..=100).contains(&n));
    }
}
