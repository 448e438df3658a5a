use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use hookflow_core::{ExecutionContext, HookflowError, Node, Outcome, RequestInfo, ResponseSink, Result};
use serde_json::Value;

use super::{named_output, Block};
use crate::interpolate::interpolate_in;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

/// `encodeText` / `decodeText`: base64, base64url, hex, utf8, ascii and
/// binary (space separated 8-bit groups of the UTF-8 bytes).
pub struct Encoding {
    direction: Direction,
}

impl Encoding {
    pub fn new(direction: Direction) -> Self {
        Encoding { direction }
    }
}

fn value_error(message: impl Into<String>) -> HookflowError {
    HookflowError::evaluation(message)
}

fn utf8(bytes: Vec<u8>, scheme: &str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| value_error(format!("decoded {} is not valid UTF-8: {}", scheme, e)))
}

pub fn encode(scheme: &str, text: &str) -> Result<String> {
    match scheme {
        "base64" => Ok(general_purpose::STANDARD.encode(text.as_bytes())),
        "base64url" => Ok(general_purpose::URL_SAFE_NO_PAD.encode(text.as_bytes())),
        "hex" => Ok(hex::encode(text.as_bytes())),
        "utf8" => Ok(text.to_string()),
        "ascii" => Ok(text.bytes().map(|b| char::from(b & 0x7f)).collect()),
        "binary" => Ok(text
            .bytes()
            .map(|b| format!("{:08b}", b))
            .collect::<Vec<_>>()
            .join(" ")),
        other => Err(value_error(format!("unknown encoding '{}'", other))),
    }
}

pub fn decode(scheme: &str, text: &str) -> Result<String> {
    match scheme {
        "base64" => {
            let bytes = general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| value_error(format!("invalid base64 string: {}", e)))?;
            utf8(bytes, scheme)
        }
        "base64url" => {
            let trimmed = text.trim().trim_end_matches('=');
            let bytes = general_purpose::URL_SAFE_NO_PAD
                .decode(trimmed)
                .map_err(|e| value_error(format!("invalid base64url string: {}", e)))?;
            utf8(bytes, scheme)
        }
        "hex" => {
            let bytes = hex::decode(text.trim())
                .map_err(|e| value_error(format!("invalid hex string: {}", e)))?;
            utf8(bytes, scheme)
        }
        "utf8" => Ok(text.to_string()),
        "ascii" => {
            let bytes: Vec<u8> = text.chars().map(|c| (c as u32 & 0xff) as u8).collect();
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "binary" => {
            let bytes = text
                .split_whitespace()
                .map(|group| {
                    u8::from_str_radix(group, 2)
                        .map_err(|_| value_error(format!("invalid binary group '{}'", group)))
                })
                .collect::<Result<Vec<u8>>>()?;
            utf8(bytes, scheme)
        }
        other => Err(value_error(format!("unknown encoding '{}'", other))),
    }
}

#[async_trait]
impl Block for Encoding {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let text = interpolate_in(&node.text("text"), ctx);
        if text.is_empty() {
            tracing::warn!(node = %node.id, "no input text to {:?}", self.direction);
            return Outcome::none();
        }

        let scheme = node.non_empty("encoding").unwrap_or_else(|| "base64".into());
        let converted = match self.direction {
            Direction::Encode => encode(&scheme, &text),
            Direction::Decode => decode(&scheme, &text),
        };
        let result = match converted {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(node = %node.id, encoding = %scheme, error = %e, "text conversion failed");
                text
            }
        };

        let value = Value::String(result);
        let name = node.non_empty("referenceVar");
        if let Some(name) = &name {
            ctx.assign(name, value.clone());
        }
        Outcome::output(named_output(name.as_deref(), value))
    }
}
