mod condition;
mod encoding;
mod generate_text;
mod manipulate_image;
mod manipulate_text;
mod provider;
mod request;
mod respond;
mod send_email;
mod send_error;
mod set_var;
mod start;

pub use condition::Condition;
pub use encoding::{Direction, Encoding};
pub use generate_text::GenerateText;
pub use manipulate_image::{ImageOp, ManipulateImage};
pub use manipulate_text::ManipulateText;
pub use request::Request;
pub use respond::Respond;
pub use send_email::SendEmail;
pub use send_error::SendError;
pub use set_var::SetVar;
pub use start::Start;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookflow_core::{
    ExecutionContext, HookflowConfig, HookflowError, Node, OpenAiConfig, Outcome, RequestInfo,
    ResendConfig, ResponseSink, Result,
};
use serde_json::{Map, Value};

/// One executable node type.
#[async_trait]
pub trait Block: Send + Sync {
    async fn run(
        &self,
        node: &Node,
        request: &RequestInfo,
        response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome;

    /// Overrides child selection: `Some(true)` runs `child`, `Some(false)`
    /// skips it, `None` leaves the decision to the executor.
    fn route(&self, _child: &Node, _ctx: &ExecutionContext) -> Option<bool> {
        None
    }
}

/// Shared resources handed to blocks that talk to the outside world.
#[derive(Debug, Clone)]
pub struct BlockSettings {
    pub client: reqwest::Client,
    pub openai: OpenAiConfig,
    pub resend: ResendConfig,
}

impl BlockSettings {
    pub fn from_config(config: &HookflowConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()
            .map_err(|e| HookflowError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(BlockSettings {
            client,
            openai: config.providers.openai.clone(),
            resend: config.providers.resend.clone(),
        })
    }
}

impl Default for BlockSettings {
    fn default() -> Self {
        BlockSettings {
            client: reqwest::Client::new(),
            openai: OpenAiConfig::default(),
            resend: ResendConfig::default(),
        }
    }
}

/// Node type → block table. Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct BlockRegistry {
    blocks: HashMap<String, Arc<dyn Block>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full catalogue, including the legacy aliases `sendResponse` and
    /// `error`.
    pub fn standard(settings: &BlockSettings) -> Self {
        let mut registry = Self::new();

        registry.register("start", Arc::new(Start));
        registry.register("condition", Arc::new(Condition));
        registry.register("setVar", Arc::new(SetVar));
        registry.register("manipulateText", Arc::new(ManipulateText));
        registry.register("encodeText", Arc::new(Encoding::new(Direction::Encode)));
        registry.register("decodeText", Arc::new(Encoding::new(Direction::Decode)));

        let respond: Arc<dyn Block> = Arc::new(Respond);
        registry.register("respond", respond.clone());
        registry.register("sendResponse", respond);

        let send_error: Arc<dyn Block> = Arc::new(SendError);
        registry.register("sendError", send_error.clone());
        registry.register("error", send_error);

        registry.register("request", Arc::new(Request::new(settings.client.clone())));
        registry.register(
            "generateText",
            Arc::new(GenerateText::new(settings.client.clone(), settings.openai.clone())),
        );
        registry.register(
            "sendEmail",
            Arc::new(SendEmail::new(settings.client.clone(), settings.resend.clone())),
        );
        registry.register(
            "manipulateImage",
            Arc::new(ManipulateImage::new(settings.client.clone())),
        );

        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, block: Arc<dyn Block>) {
        self.blocks.insert(kind.into(), block);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Block>> {
        self.blocks.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.blocks.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// The `{name: value}` output of text-producing blocks; unnamed results are
/// keyed `result`.
fn named_output(name: Option<&str>, value: Value) -> Value {
    let mut output = Map::new();
    output.insert(name.unwrap_or("result").to_string(), value);
    Value::Object(output)
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
