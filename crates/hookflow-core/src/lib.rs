mod config;
mod context;
mod error;
mod flow;
mod outcome;
mod request;
pub mod value;

pub use config::{
    FlowsConfig, HookflowConfig, HttpConfig, OpenAiConfig, ProvidersConfig, ResendConfig,
    ServerConfig, CONFIG_FILE_NAME,
};
pub use context::{ExecutionContext, ProviderError, ScopeRef, NAMESPACES};
pub use error::{HookflowError, Result};
pub use flow::{Branch, Flow, Node, QueryParam};
pub use outcome::Outcome;
pub use request::{BufferedResponse, RequestInfo, ResponseBody, ResponseSink, SentResponse};
