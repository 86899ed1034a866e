//! AI re-render presets.
//!
//! An [`Enhancer`] turns one PNG into a restyled PNG for a given
//! [`AiPreset`]. The production enhancer, [`GeminiEnhancer`], calls the
//! Gemini `generateContent` REST endpoint with the image inline and a fixed
//! prompt per preset. Every prompt opens with [`PRESERVATION_CLAUSE`] so the
//! subject stays recognisable.
//!
//! [`enhance_batch`] restyles every shot of a batch concurrently on a tokio
//! [`JoinSet`]. Results come back in input order; the first failure cancels
//! the remaining requests and fails the batch. Preset `none` never reaches
//! the network.

use crate::config::AiConfig;
use crate::imaging::SourceImage;
use crate::types::AiPreset;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub const PRESERVATION_CLAUSE: &str = "CRITICAL: You must strictly preserve the original person's facial structure, identity, and features. Do not morph the face, do not change the eye shape, nose shape, or jawline. Only apply the style/lighting/color effects.";

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("AI enhancement is not configured: {0}")]
    Config(String),
    #[error("AI service failed: {0}")]
    Service(String),
}

/// Full prompt for `preset`, or `None` for [`AiPreset::None`].
pub fn prompt_for(preset: AiPreset) -> Option<String> {
    let style = match preset {
        AiPreset::None => return None,
        AiPreset::Glow => {
            "Apply a soft, angelic glow filter to this image. Pastel colors, dreamy ethereal lighting, soft focus, slight bloom effect. High quality aesthetic."
        }
        AiPreset::Bollywood => {
            "Transform this into a 1990s Bollywood movie style still. Warm hazy lighting, vibrant chiffon colors, soft film grain, vintage romance aesthetic."
        }
        AiPreset::RetroAnime => {
            "Convert this image into a 90s retro anime style. Cel shaded, soft pastel colors, lo-fi aesthetic, nostalgic vibe. Keep the person recognizable."
        }
        AiPreset::VintageNoir => {
            "Apply a classic 1940s Hollywood Film Noir style. High contrast black and white, dramatic shadows, silver screen aesthetic, soft grain."
        }
        AiPreset::Cyber => {
            "Apply a soft vaporwave cyber aesthetic. Neon pink and purple hues, soft lighting, futuristic but retro vibe."
        }
    };
    Some(format!(
        "{PRESERVATION_CLAUSE} {style} Return ONLY the image."
    ))
}

/// Restyles a single PNG.
pub trait Enhancer: Send + Sync {
    /// Return the restyled PNG. [`AiPreset::None`] returns the input as is.
    fn enhance(
        &self,
        png: &[u8],
        preset: AiPreset,
    ) -> impl Future<Output = Result<Vec<u8>, EnhanceError>> + Send;
}

/// Restyle every image of a batch concurrently, preserving order.
#[instrument(skip(enhancer, sources), fields(images = sources.len()))]
pub async fn enhance_batch<E: Enhancer + 'static>(
    enhancer: Arc<E>,
    sources: &[SourceImage],
    preset: AiPreset,
) -> Result<Vec<SourceImage>, EnhanceError> {
    if preset == AiPreset::None {
        return Ok(sources.to_vec());
    }

    let mut set = JoinSet::new();
    for (index, source) in sources.iter().enumerate() {
        let png = source
            .to_png()
            .map_err(|e| EnhanceError::Service(format!("cannot encode shot {index}: {e}")))?;
        let enhancer = Arc::clone(&enhancer);
        set.spawn(async move { (index, enhancer.enhance(&png, preset).await) });
    }

    let mut results: Vec<Option<SourceImage>> = vec![None; sources.len()];
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = joined.map_err(|e| EnhanceError::Service(e.to_string()))?;
        let decoded = outcome.and_then(|png| {
            SourceImage::from_bytes(&png)
                .map_err(|e| EnhanceError::Service(format!("unreadable image returned: {e}")))
        });
        match decoded {
            Ok(image) => results[index] = Some(image),
            Err(e) => {
                warn!(index, error = %e, "enhancement failed, cancelling the rest");
                set.abort_all();
                return Err(e);
            }
        }
    }

    info!(%preset, "batch enhanced");
    results
        .into_iter()
        .map(|r| r.ok_or_else(|| EnhanceError::Service("missing result".into())))
        .collect()
}

// =========================================================================
// Gemini
// =========================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

/// Image bytes from the first candidate's first inline-data part.
fn extract_image(response: &GenerateResponse) -> Result<Vec<u8>, EnhanceError> {
    let data = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.inline_data.as_ref())
                .find(|d| !d.data.is_empty())
        })
        .ok_or_else(|| EnhanceError::Service("No image data returned from AI".into()))?;
    BASE64
        .decode(&data.data)
        .map_err(|e| EnhanceError::Service(format!("bad base64 in response: {e}")))
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiEnhancer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiEnhancer {
    pub fn new(
        api_key: Option<String>,
        model: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, EnhanceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnhanceError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Build from the `[ai]` config section. The key comes from `api_key`
    /// or, failing that, the environment variable named by `api_key_env`.
    pub fn from_config(config: &AiConfig) -> Result<Self, EnhanceError> {
        let key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok());
        Self::new(
            key,
            &config.model,
            &config.endpoint,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl Enhancer for GeminiEnhancer {
    async fn enhance(&self, png: &[u8], preset: AiPreset) -> Result<Vec<u8>, EnhanceError> {
        let Some(prompt) = prompt_for(preset) else {
            return Ok(png.to_vec());
        };
        let Some(key) = self.api_key.as_deref() else {
            warn!("no Gemini API key found, skipping enhancement");
            return Err(EnhanceError::Config("API Key not configured".into()));
        };

        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: "image/png".into(),
                            data: BASE64.encode(png),
                        },
                    },
                    RequestPart::Text { text: &prompt },
                ],
            }],
        };

        debug!(model = %self.model, %preset, bytes = png.len(), "calling Gemini");
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| EnhanceError::Service(e.to_string()))?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| EnhanceError::Service(format!("unexpected response: {e}")))?;
        extract_image(&parsed)
    }
}
