//! Static helpers reachable from templates, e.g. `{current_time}` or
//! `{random_number.10}`.

mod math;
mod random;
mod text;
mod time;
mod uuid;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

pub type HelperFn = fn(Option<&Value>) -> Value;

#[derive(Debug, Clone, Copy)]
pub struct Helper {
    pub name: &'static str,
    func: HelperFn,
}

impl Helper {
    pub fn new(name: &'static str, func: HelperFn) -> Self {
        Helper { name, func }
    }

    pub fn call(&self, arg: Option<&Value>) -> Value {
        (self.func)(arg)
    }
}

#[derive(Debug, Default)]
pub struct HelperTable {
    helpers: HashMap<&'static str, Helper>,
}

impl HelperTable {
    pub fn register(&mut self, helper: Helper) {
        self.helpers.insert(helper.name, helper);
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.helpers.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.helpers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

static HELPERS: Lazy<HelperTable> = Lazy::new(|| {
    let mut table = HelperTable::default();
    math::register(&mut table);
    random::register(&mut table);
    text::register(&mut table);
    time::register(&mut table);
    uuid::register(&mut table);
    table
});

pub fn helpers() -> &'static HelperTable {
    &HELPERS
}

pub fn helper(name: &str) -> Option<&'static Helper> {
    HELPERS.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        assert_eq!(
            helpers().names(),
            vec!["charCount", "current_date", "current_time", "random_number", "solve", "uuid"]
        );
        assert!(helper("nope").is_none());
    }
}
