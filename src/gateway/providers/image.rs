//! Image generation through the OpenAI images API.

use super::{classify_openai_error, require_credential};
use crate::config::ProviderConfig;
use crate::error::{MuseError, Result};
use crate::gateway::{
    GenerationOptions, GenerationRequest, GenerationResult, MediaAsset, MediaFormat, Output,
    Provider, ProviderId,
};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::Engine;

pub struct ImageProvider {
    model: String,
    client: Client<OpenAIConfig>,
}

impl ImageProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let credential = require_credential(config)?;
        let client = create_client(credential, config.base_url.as_ref(), config.timeout)?;

        Ok(Self {
            model: config.model.clone(),
            client,
        })
    }

    fn is_dalle3(&self) -> bool {
        self.model == "dall-e-3"
    }

    fn image_model(&self) -> ImageModel {
        match self.model.as_str() {
            "dall-e-2" => ImageModel::DallE2,
            "dall-e-3" => ImageModel::DallE3,
            other => ImageModel::Other(other.to_string()),
        }
    }

    async fn request_batch(&self, prompt: &str, n: u8, size: ImageSize) -> Result<Vec<MediaAsset>> {
        let api_request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(self.image_model())
            .n(n)
            .size(size)
            .response_format(ImageResponseFormat::B64Json)
            .build()
            .map_err(|e| classify_openai_error(ProviderId::OpenAi, e))?;

        let response = self
            .client
            .images()
            .create(api_request)
            .await
            .map_err(|e| classify_openai_error(ProviderId::OpenAi, e))?;

        response.data.iter().map(|image| decode_image(image)).collect()
    }
}

/// Map a pixel size to one the model accepts.
fn image_size(width: u32, height: u32, dalle3: bool) -> Result<ImageSize> {
    let size = match (width, height, dalle3) {
        (1024, 1024, _) => ImageSize::S1024x1024,
        (1792, 1024, true) => ImageSize::S1792x1024,
        (1024, 1792, true) => ImageSize::S1024x1792,
        (256, 256, false) => ImageSize::S256x256,
        (512, 512, false) => ImageSize::S512x512,
        _ => {
            let supported = if dalle3 {
                "1024x1024, 1792x1024, 1024x1792"
            } else {
                "256x256, 512x512, 1024x1024"
            };
            return Err(MuseError::InvalidRequest(format!(
                "unsupported image size {}x{} (use {})",
                width, height, supported
            )));
        }
    };
    Ok(size)
}

fn decode_image(image: &Image) -> Result<MediaAsset> {
    match image {
        Image::B64Json {
            b64_json,
            revised_prompt,
        } => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64_json.as_bytes())
                .map_err(|e| MuseError::provider(ProviderId::OpenAi, format!("invalid image data: {}", e)))?;
            let mut asset = MediaAsset::from_bytes(sniff_format(&bytes), bytes);
            asset.revised_prompt = revised_prompt.as_ref().map(|p| p.to_string());
            Ok(asset)
        }
        Image::Url { .. } => Err(MuseError::provider(
            ProviderId::OpenAi,
            "expected base64 image data, got a URL",
        )),
    }
}

fn sniff_format(bytes: &[u8]) -> MediaFormat {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        MediaFormat::Jpeg
    } else {
        MediaFormat::Png
    }
}

#[async_trait]
impl Provider for ImageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let prompt = request
            .prompt()
            .ok_or_else(|| MuseError::InvalidRequest("image generation needs a prompt".to_string()))?;

        let size = image_size(
            options.width.unwrap_or(1024),
            options.height.unwrap_or(1024),
            self.is_dalle3(),
        )?;
        let count = options.count.unwrap_or(1).max(1) as u8;

        // dall-e-3 only accepts n = 1.
        let mut images = Vec::with_capacity(count as usize);
        if self.is_dalle3() {
            for _ in 0..count {
                images.extend(self.request_batch(prompt, 1, size.clone()).await?);
            }
        } else {
            images = self.request_batch(prompt, count, size).await?;
        }

        if images.is_empty() {
            return Err(MuseError::provider(ProviderId::OpenAi, "no images returned"));
        }

        Ok(GenerationResult::new(
            request,
            ProviderId::OpenAi,
            &self.model,
            Output::Images(images),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_image_size_mapping() {
        assert!(matches!(image_size(1024, 1024, true), Ok(ImageSize::S1024x1024)));
        assert!(matches!(image_size(1792, 1024, true), Ok(ImageSize::S1792x1024)));
        assert!(matches!(image_size(512, 512, false), Ok(ImageSize::S512x512)));

        let err = image_size(512, 512, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("1792x1024"));
        assert!(image_size(1792, 1024, false).is_err());
    }

    #[test]
    fn test_decode_b64_image() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n");
        let image = Image::B64Json {
            b64_json: Arc::new(encoded),
            revised_prompt: Some("a calm lake".to_string()),
        };
        let asset = decode_image(&image).unwrap();
        assert_eq!(asset.format, MediaFormat::Png);
        assert_eq!(asset.revised_prompt.as_deref(), Some("a calm lake"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let image = Image::B64Json {
            b64_json: Arc::new("***".to_string()),
            revised_prompt: None,
        };
        assert_eq!(decode_image(&image).unwrap_err().kind(), ErrorKind::ProviderError);
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), MediaFormat::Jpeg);
        assert_eq!(sniff_format(b"\x89PNG"), MediaFormat::Png);
    }
}
