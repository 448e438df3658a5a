use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use hookflow_core::{
    ExecutionContext, Flow, HookflowConfig, Node, RequestInfo, ResponseBody, SentResponse,
};
use hookflow_eval::{eval_str, interpolate_in, natives, BlockRegistry, BlockSettings, Executor};
use serde_json::{json, Map, Value};

/// Synthetic request assembled from command line flags.
pub struct RunRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<String>,
    pub headers: Vec<String>,
    pub body: Option<String>,
}

impl RunRequest {
    fn into_request(self) -> Result<RequestInfo> {
        let mut request = RequestInfo::new(self.method, self.path);
        for pair in &self.query {
            let (key, value) = split_pair(pair)?;
            request = request.with_query(key, value);
        }
        for pair in &self.headers {
            let (key, value) = split_pair(pair)?;
            request = request.with_header(key, value);
        }
        if let Some(body) = self.body {
            let body: Value = serde_json::from_str(&body).context("--body is not valid JSON")?;
            request = request.with_body(body);
        }
        Ok(request)
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("expected KEY=VALUE, got '{}'", pair),
    }
}

fn load_config(path: Option<&Path>) -> Result<HookflowConfig> {
    HookflowConfig::discover(path).map_err(|e| anyhow!(e))
}

fn registry(config: &HookflowConfig) -> Result<BlockRegistry> {
    let settings = BlockSettings::from_config(config).map_err(|e| anyhow!(e))?;
    Ok(BlockRegistry::standard(&settings))
}

fn load_flow(path: &Path) -> Result<Flow> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Flow::parse(&source).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

pub async fn run_flow(
    flow_path: &Path,
    config_path: Option<&Path>,
    request: RunRequest,
    dump_context: bool,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let flow = Arc::new(load_flow(flow_path)?);
    let request = request.into_request()?;
    let executor = Executor::new(Arc::new(registry(&config)?));

    let run = executor.execute(flow, &request).await;

    if verbose {
        for (index, output) in run.outputs.iter().enumerate() {
            eprintln!("[output {}] {}", index, output);
        }
    }
    if dump_context {
        eprintln!("{}", serde_json::to_string_pretty(&run.context.snapshot())?);
    }

    match &run.response {
        Some(response) => {
            println!("{}", render_response(response)?);
            Ok(())
        }
        None => match run.last_error() {
            Some(error) => bail!("flow finished without a response: {}", error),
            None => bail!("flow finished without a response"),
        },
    }
}

fn render_response(response: &SentResponse) -> Result<String> {
    let body = match &response.body {
        ResponseBody::Json(body) => body.clone(),
        ResponseBody::Text(text) => Value::String(text.clone()),
    };
    let rendered = json!({"status": response.status, "body": body});
    Ok(serde_json::to_string_pretty(&rendered)?)
}

/// Context for ad hoc templates: an empty flow whose `variables` are the
/// given JSON object.
fn template_context(context: Option<&str>) -> Result<ExecutionContext> {
    let variables = match context {
        Some(source) => {
            match serde_json::from_str::<Value>(source).context("--context is not valid JSON")? {
                Value::Object(map) => map,
                other => bail!("--context must be a JSON object, got {}", other),
            }
        }
        None => Map::new(),
    };
    let mut ctx = ExecutionContext::new(Arc::new(Flow::from_node(Node::new("root", "start"))));
    ctx.variables = variables;
    Ok(ctx)
}

pub fn render_template(template: &str, context: Option<&str>) -> Result<()> {
    let ctx = template_context(context)?;
    println!("{}", interpolate_in(template, &ctx));
    Ok(())
}

pub fn eval_expression(expression: &str) -> Result<()> {
    let value = eval_str(expression).map_err(|e| anyhow!(e))?;
    println!("{}", value);
    Ok(())
}

pub fn list_helpers() -> Result<()> {
    for name in natives::helpers().names() {
        println!("{}", name);
    }
    Ok(())
}

pub fn list_blocks(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    for kind in registry(&config)?.kinds() {
        println!("{}", kind);
    }
    Ok(())
}
