//! Image label detection.
//!
//! Provides the `LabelDetector` trait and its Google Cloud Vision implementation,
//! plus the pipeline that turns an image into candidate ingredients. Detection
//! failures never abort an analysis: they yield an empty ingredient list with an
//! `Unavailable` status.

use allercheck_features::FoodLabelFilter;
use allercheck_model::{DetectionSource, DetectionStatus, IngredientDetection};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// Errors from label detection.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Vision API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("No Vision API key configured")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for image-labeling services.
pub trait LabelDetector {
    /// Return the raw labels the service sees in an image.
    fn detect_labels(
        &self,
        image: &[u8],
    ) -> impl Future<Output = Result<Vec<String>, VisionError>> + Send;

    /// Get the detector name for logging.
    fn name(&self) -> &'static str;
}

/// Cloud Vision client configuration.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL for the Vision REST API
    pub base_url: String,
    /// API key sent as the `key` query parameter
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Labels requested per image
    pub max_results: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://vision.googleapis.com".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_results: 20,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

/// Google Cloud Vision label detector.
pub struct CloudVisionDetector {
    config: VisionConfig,
    client: reqwest::Client,
}

impl CloudVisionDetector {
    /// Create a new Cloud Vision detector.
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VisionError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build the `images:annotate` request body.
    fn build_request(&self, image: &[u8]) -> serde_json::Value {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: "LABEL_DETECTION",
                    max_results: self.config.max_results,
                }],
            }],
        };
        serde_json::json!(request)
    }

    /// Parse the annotate response into label descriptions.
    fn parse_response(&self, response: serde_json::Value) -> Result<Vec<String>, VisionError> {
        let parsed: AnnotateResponse = serde_json::from_value(response)
            .map_err(|e| VisionError::ParseError(e.to_string()))?;

        let Some(first) = parsed.responses.into_iter().next() else {
            return Ok(Vec::new());
        };

        if let Some(status) = first.error {
            return Err(VisionError::Api(status.message));
        }

        Ok(first
            .label_annotations
            .into_iter()
            .map(|label| label.description)
            .filter(|description| !description.is_empty())
            .collect())
    }
}

impl LabelDetector for CloudVisionDetector {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::MissingApiKey)?;

        let body = self.build_request(image);

        tracing::debug!(bytes = image.len(), "Sending image to Cloud Vision");

        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.config.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Api(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VisionError::ParseError(e.to_string()))?;

        self.parse_response(json)
    }

    fn name(&self) -> &'static str {
        "cloud-vision"
    }
}

/// Run an image through a detector and the food-label filter.
///
/// Never fails: detector errors are logged and reported as
/// `DetectionStatus::Unavailable` with no ingredients.
pub async fn detect_ingredients<D: LabelDetector>(
    detector: &D,
    image: &[u8],
    filter: &FoodLabelFilter,
) -> IngredientDetection {
    let raw_labels = match detector.detect_labels(image).await {
        Ok(labels) => labels,
        Err(e) => {
            tracing::warn!(detector = detector.name(), error = %e, "Label detection unavailable");
            return IngredientDetection::unavailable(DetectionSource::Image, e.to_string());
        }
    };

    let ingredients = filter.apply(&raw_labels);
    let status = if ingredients.is_empty() {
        DetectionStatus::NoFoodLabels
    } else {
        DetectionStatus::Detected
    };

    tracing::debug!(
        detector = detector.name(),
        labels = raw_labels.len(),
        ingredients = ingredients.len(),
        "Detected ingredients"
    );

    IngredientDetection {
        source: DetectionSource::Image,
        status,
        ingredients,
        raw_labels,
    }
}

/// Decoded image bytes and their declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Decode a `data:image/...;base64,...` URL.
pub fn decode_data_url(data_url: &str) -> Result<ImagePayload, VisionError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| VisionError::InvalidDataUrl("missing data: prefix".to_string()))?;

    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| VisionError::InvalidDataUrl("missing payload".to_string()))?;

    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| VisionError::InvalidDataUrl("payload is not base64".to_string()))?;

    if !mime_type.starts_with("image/") {
        return Err(VisionError::InvalidDataUrl(format!(
            "unsupported type {}",
            mime_type
        )));
    }

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| VisionError::InvalidDataUrl(e.to_string()))?;

    Ok(ImagePayload {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

/// Load an image from a data URL or a file path.
pub async fn load_image(source: &str) -> Result<ImagePayload, VisionError> {
    if source.starts_with("data:") {
        return decode_data_url(source);
    }

    let bytes = tokio::fs::read(source).await?;
    Ok(ImagePayload {
        mime_type: mime_from_extension(Path::new(source)).to_string(),
        bytes,
    })
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}
