use chrono::{Local, SecondsFormat, Utc};
use serde_json::Value;

use super::{Helper, HelperTable};

pub fn register(table: &mut HelperTable) {
    table.register(Helper::new("current_time", current_time));
    table.register(Helper::new("current_date", current_date));
}

fn current_time(_arg: Option<&Value>) -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Local date as `M/D/YYYY`.
fn current_date(_arg: Option<&Value>) -> Value {
    Value::String(Local::now().format("%-m/%-d/%Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_is_rfc3339() {
        let value = current_time(None);
        let text = value.as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
        assert!(text.ends_with('Z'));
    }

    #[test]
    fn test_current_date_shape() {
        let value = current_date(None);
        let parts: Vec<_> = value.as_str().unwrap().split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 4);
        assert!(!parts[0].starts_with('0'));
    }
}
