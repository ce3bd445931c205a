//! Image generation through the model provider.
//!
//! Reference images in the assets directory are attached to every request so
//! the character stays consistent across pictures.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use murmur_core::message::Message;
use murmur_core::provider::{Provider, ProviderRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

const IMAGE_SYSTEM_PROMPT: &str = "You are an image generation assistant.

Generate an image from the reference images provided (for consistent character appearance) and the user's description.

- Always output an image
- Keep the character consistent with the reference images
- Follow the prompt for scene, action, and style
- Keep characters small in frame (8-15% of the image)
- Vary compositions";

/// Generates images with the configured image model.
pub struct ImageStudio {
    provider: Arc<dyn Provider>,
    model: String,
    assets_dir: Option<PathBuf>,
    enabled: bool,
}

impl ImageStudio {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, assets_dir: Option<PathBuf>, enabled: bool) -> Self {
        Self {
            provider,
            model: model.into(),
            assets_dir,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Generate an image for `prompt`. `None` on any failure or when disabled.
    pub async fn generate(&self, prompt: &str) -> Option<Vec<u8>> {
        if !self.enabled {
            info!("Image generation is disabled");
            return None;
        }

        let references = match &self.assets_dir {
            Some(dir) => load_reference_images(dir).await,
            None => Vec::new(),
        };
        info!(references = references.len(), prompt = %truncate(prompt, 100), "Generating image");

        let mut user = Message::user(prompt);
        for uri in references {
            user = user.with_image(uri);
        }
        let request = ProviderRequest::new(&self.model, vec![Message::system(IMAGE_SYSTEM_PROMPT), user]).with_image_output();

        let response = match self.provider.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "Image generation failed");
                return None;
            }
        };

        let Some(uri) = response.images.first() else {
            error!("No image data in response");
            return None;
        };
        let bytes = decode_data_uri(uri);
        match &bytes {
            Some(b) => info!(bytes = b.len(), "Generated image"),
            None => error!("Image response was not a base64 data URI"),
        }
        bytes
    }
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(',')?;
    STANDARD.decode(payload.trim()).ok()
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    })
}

/// Every supported image in `dir` as a data URI, in file-name order.
async fn load_reference_images(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Assets folder not readable");
            return Vec::new();
        }
    };

    let mut paths = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if mime_for(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(mime) = mime_for(&path) else { continue };
        match tokio::fs::read(&path).await {
            Ok(bytes) => images.push(format!("data:{mime};base64,{}", STANDARD.encode(bytes))),
            Err(e) => error!(path = %path.display(), error = %e, "Error loading reference image"),
        }
    }
    images
}

/// At most `max` characters of `s`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_providers::{ScriptedProvider, image_response, text_response};

    #[test]
    fn decodes_data_uris() {
        assert_eq!(decode_data_uri("data:image/png;base64,aGVsbG8="), Some(b"hello".to_vec()));
        assert_eq!(decode_data_uri("https://example.com/a.png"), None);
        assert_eq!(decode_data_uri("data:image/png;base64,***"), None);
    }

    #[tokio::test]
    async fn disabled_studio_never_calls_the_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![image_response("data:image/png;base64,aGVsbG8=")]));
        let studio = ImageStudio::new(provider.clone(), "img", None, false);
        assert!(studio.generate("a cat").await.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn returns_decoded_bytes() {
        let provider = Arc::new(ScriptedProvider::new(vec![image_response("data:image/png;base64,aGVsbG8=")]));
        let studio = ImageStudio::new(provider.clone(), "img", None, true);
        assert_eq!(studio.generate("a cat").await, Some(b"hello".to_vec()));
        let request = &provider.requests()[0];
        assert!(request.image_output);
        assert_eq!(request.model, "img");
    }

    #[tokio::test]
    async fn text_only_answer_is_none() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("I cannot draw")]));
        let studio = ImageStudio::new(provider, "img", None, true);
        assert!(studio.generate("a cat").await.is_none());
    }

    #[tokio::test]
    async fn attaches_reference_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let provider = Arc::new(ScriptedProvider::new(vec![image_response("data:image/png;base64,aGVsbG8=")]));
        let studio = ImageStudio::new(provider.clone(), "img", Some(dir.path().to_path_buf()), true);
        studio.generate("a cat").await;

        let request = &provider.requests()[0];
        let user = &request.messages[1];
        assert_eq!(user.images.len(), 1);
        assert!(user.images[0].starts_with("data:image/png;base64,"));
    }
}
