use hookflow_core::value::render;
use hookflow_core::ExecutionContext;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::resolve::resolve;

static TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

/// Replaces every `{path}` span in `template` with the rendered value of
/// `path`. Text outside spans is kept verbatim.
pub fn interpolate(template: &str, ctx: &ExecutionContext, defaults: &Map<String, Value>) -> String {
    if template.is_empty() {
        return String::new();
    }
    TEMPLATE_RE
        .replace_all(template, |caps: &Captures| {
            render(&resolve(ctx, caps[1].trim(), defaults))
        })
        .into_owned()
}

/// [`interpolate`] against the flow's own query parameter defaults.
pub fn interpolate_in(template: &str, ctx: &ExecutionContext) -> String {
    interpolate(template, ctx, ctx.defaults())
}
