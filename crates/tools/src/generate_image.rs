//! Image generation as a plan step (batch mode).

use crate::context::{ToolContext, ToolOutput};
use crate::params::decode;
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;

pub struct GenerateImageTool;

#[derive(Deserialize)]
struct Params {
    prompt: String,
}

const PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "prompt",
    "string",
    "Text description of the image to generate",
)];

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> ToolName {
        ToolName::GenerateImage
    }

    fn description(&self) -> &'static str {
        "Generate an image based on a text description using reference images for consistent character appearance"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { prompt } = decode(params)?;
        Ok(match ctx.studio.generate(&prompt).await {
            Some(bytes) => ToolOutput::ok("Image generated successfully.").with_image(bytes),
            None => ToolOutput::failure("Failed. Continue without image."),
        })
    }
}
