//! Variable path resolution for `{path.to.value}` references.
//!
//! A path names a value in the execution context. The first segment picks a
//! root, tried in this order until one resolves the whole path:
//!
//! 1. a context namespace (`local`, `params`, `result`, `variables`, `flow`,
//!    `endpoint`, `req`, `error`),
//! 2. `local[first]`, `result[first]`, `params[first]`, `variables[first]`,
//! 3. the flow's declared query parameter defaults.
//!
//! When nothing resolves, a static helper named by the first segment is
//! called with the rest of the path as its argument. A path that only misses
//! its last segment falls back to a variable, default or helper named by that
//! segment. Everything else resolves to `""`.

use std::borrow::Cow;

use hookflow_core::value::{render, strip_quotes};
use hookflow_core::{ExecutionContext, ScopeRef};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};

use crate::eval::eval_str;
use crate::natives;

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

enum Walk {
    Found(Value),
    /// Index into the walked segments of the first one that did not match.
    Missing(usize),
}

/// Resolves `path` against `ctx`, using `defaults` as the last data root.
pub fn resolve(ctx: &ExecutionContext, path: &str, defaults: &Map<String, Value>) -> Value {
    let path = expand_brackets(path.trim());
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return empty();
    }

    let (first, rest) = (segments[0], &segments[1..]);
    let mut missed_last = false;

    for root in candidates(ctx, first, defaults) {
        match walk_scope(root, rest) {
            Walk::Found(value) => return value,
            Walk::Missing(at) => missed_last |= !rest.is_empty() && at + 1 == rest.len(),
        }
    }

    if let Some(helper) = natives::helper(first) {
        if rest.is_empty() {
            return helper.call(None);
        }
        return helper.call(Some(&helper_arg(&rest.join("."))));
    }

    if missed_last {
        let last = segments[segments.len() - 1];
        if let Some(value) = ctx.variables.get(last).or_else(|| defaults.get(last)) {
            return value.clone();
        }
        if let Some(helper) = natives::helper(last) {
            return helper.call(None);
        }
    }

    empty()
}

fn empty() -> Value {
    Value::String(String::new())
}

fn candidates<'a>(
    ctx: &'a ExecutionContext,
    first: &str,
    defaults: &'a Map<String, Value>,
) -> Vec<ScopeRef<'a>> {
    let mut roots = Vec::with_capacity(6);
    if let Some(scope) = ctx.namespace(first) {
        roots.push(scope);
    }
    for scope in [&ctx.local, &ctx.result, &ctx.params, &ctx.variables, defaults] {
        if let Some(value) = scope.get(first) {
            roots.push(ScopeRef::Value(value));
        }
    }
    roots
}

fn walk_scope(root: ScopeRef<'_>, segments: &[&str]) -> Walk {
    match root {
        ScopeRef::Value(value) => walk(value, segments),
        ScopeRef::Map(map) => match segments.split_first() {
            None => Walk::Found(Value::Object(map.clone())),
            Some((key, rest)) => match map.get(*key) {
                Some(value) => match walk(value, rest) {
                    Walk::Missing(at) => Walk::Missing(at + 1),
                    found => found,
                },
                None => Walk::Missing(0),
            },
        },
    }
}

fn walk(root: &Value, segments: &[&str]) -> Walk {
    let mut current = root;
    for (i, segment) in segments.iter().enumerate() {
        match current {
            Value::Object(map) => match map.get(*segment) {
                Some(next) => current = next,
                None => return Walk::Missing(i),
            },
            Value::Array(items) if *segment == "length" => {
                return length(items.len(), i, segments.len())
            }
            Value::Array(items) => {
                match segment.parse::<usize>().ok().and_then(|idx| items.get(idx)) {
                    Some(next) => current = next,
                    None => return Walk::Missing(i),
                }
            }
            Value::String(s) if *segment == "length" => {
                return length(s.chars().count(), i, segments.len())
            }
            _ => return Walk::Missing(i),
        }
    }
    Walk::Found(current.clone())
}

fn length(len: usize, at: usize, total: usize) -> Walk {
    if at + 1 == total {
        Walk::Found(json!(len))
    } else {
        Walk::Missing(at + 1)
    }
}

/// Rewrites every `name[expr]` into `name.<value of expr>`.
pub fn expand_brackets(path: &str) -> Cow<'_, str> {
    BRACKET_RE.replace_all(path, |caps: &Captures| {
        let inner = caps[1].trim();
        let key = match eval_str(inner) {
            Ok(value) => render(&value),
            Err(_) => strip_quotes(inner).unwrap_or(inner).to_string(),
        };
        format!(".{}", key)
    })
}

fn helper_arg(text: &str) -> Value {
    let trimmed = text.trim();
    Value::String(strip_quotes(trimmed).unwrap_or(trimmed).to_string())
}
