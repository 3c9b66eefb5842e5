//! Image generation providers.
//!
//! Every backend returns a single base64-encoded image. Backends that only
//! hand back URLs download and re-encode internally so callers never see
//! the difference.

mod openai;
mod replicate;
mod stability;
mod together;

pub use openai::OpenAiImageClient;
pub use replicate::ReplicateClient;
pub use stability::StabilityClient;
pub use together::TogetherClient;

use crate::config::is_placeholder_key;
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

/// Appended to every caller prompt.
pub const QUALITY_SUFFIX: &str = ", high quality, detailed, professional, social media ready";

/// Negative prompt sent to backends that accept one.
pub const NEGATIVE_PROMPT: &str =
    "blurry, low quality, distorted, watermark, text, signature, bad anatomy";

/// Output width and height in pixels.
pub const IMAGE_SIZE: u32 = 1024;

/// Diffusion step count.
pub const IMAGE_STEPS: u32 = 30;

/// Trait for image generation providers.
pub trait ImageProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Returns true if credentials are present.
    fn is_configured(&self) -> bool;

    /// Generates one image and returns it base64-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] on missing credentials, upstream
    /// failure, or a response containing no image.
    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String>;
}

impl<P: ImageProvider + ?Sized> ImageProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }

    fn generate_composite(&self, prompt: &str, base_image: Option<&Path>) -> Result<String> {
        (**self).generate_composite(prompt, base_image)
    }
}

/// Returns the caller prompt with the quality boilerplate appended.
#[must_use]
pub fn composite_prompt(prompt: &str) -> String {
    format!("{}{QUALITY_SUFFIX}", prompt.trim())
}

/// Returns the key if set and not a placeholder, otherwise a provider error.
pub(crate) fn require_key<'a>(
    provider: &'static str,
    key_var: &str,
    key: Option<&'a SecretString>,
) -> Result<&'a str> {
    key.map(|key| key.expose_secret())
        .filter(|key| !is_placeholder_key(key))
        .ok_or_else(|| Error::provider(provider, format!("{key_var} not set")))
}

/// Reads a local image into a `data:` URL.
pub(crate) fn path_to_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::operation("read_image", format!("{}: {e}", path.display())))?;
    let mime = mime_for_path(path).unwrap_or("image/png");
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

/// Guesses an image MIME type from the file extension.
pub(crate) fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Logs that a backend ignores the base image.
fn log_ignored_base_image(provider: &'static str, base_image: Option<&Path>) {
    if let Some(path) = base_image {
        tracing::debug!(
            provider,
            base_image = %path.display(),
            "Backend is text-to-image only, ignoring base image"
        );
    }
}
