use std::io::Cursor;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hookflow_core::value::parse_number;
use hookflow_core::{ExecutionContext, Node, Outcome, ProviderError, RequestInfo, ResponseSink};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde_json::Value;

use super::provider::{record_failure, transport_error};
use super::{named_output, Block};
use crate::interpolate::interpolate_in;

const SOURCE: &str = "image";

/// Filters applied to a fetched image. The result is a PNG data URL stored
/// under `referenceVar`.
pub struct ManipulateImage {
    client: reqwest::Client,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageOp {
    /// Multiplies every channel.
    Brightness(f32),
    /// Scales channels around mid-gray.
    Contrast(f32),
    Saturation(f32),
    /// Blends toward luminance; `1.0` is fully gray.
    Grayscale(f32),
    /// Negates, then scales by the level when below `1.0`.
    Invert(f32),
    Blur(f32),
    Hue(i32),
    Unchanged,
}

/// `"150"` → `1.5`; blank, zero or non-numeric input is `1.0`.
fn percent(text: &str) -> f32 {
    match parse_number(text) {
        Some(n) if n != 0.0 => (n / 100.0) as f32,
        _ => 1.0,
    }
}

impl ImageOp {
    pub fn parse(operation: &str, amount: &str, level: &str, blur: &str) -> ImageOp {
        match operation.trim() {
            "brightness" => ImageOp::Brightness(percent(amount)),
            "contrast" => ImageOp::Contrast(percent(amount)),
            "saturation" => ImageOp::Saturation(percent(amount)),
            "grayscale" => ImageOp::Grayscale(percent(level).min(1.0)),
            "invert" => ImageOp::Invert(percent(level).min(1.0)),
            "blur" => ImageOp::Blur(parse_number(blur).unwrap_or(0.0) as f32),
            "hue" => ImageOp::Hue(parse_number(amount).unwrap_or(0.0) as i32),
            other => {
                tracing::warn!(operation = other, "unknown image operation");
                ImageOp::Unchanged
            }
        }
    }
}

fn luma(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

/// Maps the color channels of every pixel, leaving alpha alone.
fn map_rgb(image: &DynamicImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> DynamicImage {
    let mut buffer: RgbaImage = image.to_rgba8();
    for pixel in buffer.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [r, g, b] = f([r as f32, g as f32, b as f32]);
        pixel.0 = [
            r.round().clamp(0.0, 255.0) as u8,
            g.round().clamp(0.0, 255.0) as u8,
            b.round().clamp(0.0, 255.0) as u8,
            a,
        ];
    }
    DynamicImage::ImageRgba8(buffer)
}

pub fn apply(image: DynamicImage, op: ImageOp) -> DynamicImage {
    match op {
        ImageOp::Brightness(factor) => map_rgb(&image, |c| c.map(|v| v * factor)),
        ImageOp::Contrast(factor) => {
            map_rgb(&image, |c| c.map(|v| 128.0 + factor * (v - 128.0)))
        }
        ImageOp::Saturation(factor) => map_rgb(&image, |c| {
            let gray = luma(c);
            c.map(|v| gray + (v - gray) * factor)
        }),
        ImageOp::Grayscale(level) => map_rgb(&image, |c| {
            let gray = luma(c);
            c.map(|v| v + (gray - v) * level)
        }),
        ImageOp::Invert(level) => {
            let mut image = image;
            image.invert();
            if level < 1.0 {
                map_rgb(&image, |c| c.map(|v| v * level))
            } else {
                image
            }
        }
        ImageOp::Blur(sigma) if sigma > 0.0 => image.blur(sigma),
        ImageOp::Hue(degrees) if degrees != 0 => image.huerotate(degrees),
        ImageOp::Blur(_) | ImageOp::Hue(_) | ImageOp::Unchanged => image,
    }
}

/// Decodes, filters and re-encodes as a PNG data URL.
pub fn render(bytes: &[u8], op: ImageOp) -> Result<String, ProviderError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ProviderError::new(SOURCE, "decode_error", e.to_string()))?;
    let filtered = apply(decoded, op);

    let mut png = Cursor::new(Vec::new());
    filtered
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ProviderError::new(SOURCE, "encode_error", e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())))
}

impl ManipulateImage {
    pub fn new(client: reqwest::Client) -> Self {
        ManipulateImage { client }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(SOURCE, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::new(
                SOURCE,
                "fetch_error",
                format!("fetching {} failed with status {}", url, status.as_u16()),
            )
            .with_status(Some(status.as_u16())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(SOURCE, &e))?;
        Ok(bytes.to_vec())
    }

    async fn process(&self, url: &str, op: ImageOp) -> Result<String, ProviderError> {
        let bytes = self.fetch(url).await?;
        tokio::task::spawn_blocking(move || render(&bytes, op))
            .await
            .map_err(|e| ProviderError::new(SOURCE, "processing_error", e.to_string()))?
    }
}

#[async_trait]
impl Block for ManipulateImage {
    async fn run(
        &self,
        node: &Node,
        _request: &RequestInfo,
        _response: &mut dyn ResponseSink,
        ctx: &mut ExecutionContext,
    ) -> Outcome {
        let url = interpolate_in(&node.text("imageUrl"), ctx);
        if url.trim().is_empty() {
            tracing::warn!(node = %node.id, "manipulateImage without imageUrl");
            return Outcome::none();
        }

        let op = ImageOp::parse(
            &node.text("operation"),
            &interpolate_in(&node.text("amount"), ctx),
            &interpolate_in(&node.text("level"), ctx),
            &interpolate_in(&node.text("blur"), ctx),
        );
        let name = node.non_empty("referenceVar");

        tracing::debug!(node = %node.id, url = %url, op = ?op, "manipulating image");
        match self.process(url.trim(), op).await {
            Ok(data_url) => {
                let value = Value::String(data_url);
                if let Some(name) = &name {
                    ctx.assign(name, value.clone());
                }
                Outcome::output(named_output(Some(name.as_deref().unwrap_or("imageUrl")), value))
            }
            Err(error) => {
                record_failure(ctx, error);
                Outcome::none()
            }
        }
    }
}
