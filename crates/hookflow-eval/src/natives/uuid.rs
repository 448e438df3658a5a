use serde_json::Value;
use uuid::Uuid;

use super::{Helper, HelperTable};

pub fn register(table: &mut HelperTable) {
    table.register(Helper::new("uuid", uuid_fn));
}

fn uuid_fn(_arg: Option<&Value>) -> Value {
    Value::String(Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_v4() {
        let first = uuid_fn(None);
        let parsed = Uuid::parse_str(first.as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(first, uuid_fn(None));
    }
}
