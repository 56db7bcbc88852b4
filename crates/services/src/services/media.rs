//! Image CDN (Cloudinary) uploads and deletions.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::future::try_join_all;
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
pub const UPLOAD_FOLDER: &str = "construction-projects";
/// Fit inside 1200x800, automatic quality.
pub const UPLOAD_TRANSFORMATION: &str = "c_limit,h_800,w_1200/q_auto";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone, Error)]
pub enum MediaError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("cdn rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Serde(String),
}

/// An in-memory file taken from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedImage, MediaError>;

    async fn delete_image(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Uploads concurrently and fails on the first error.
pub async fn upload_all(
    store: &dyn MediaStore,
    images: Vec<ImageUpload>,
) -> Result<Vec<UploadedImage>, MediaError> {
    try_join_all(images.into_iter().map(|image| store.upload_image(image))).await
}

/// Public ids travel in a single path segment with `~` in place of `/`.
pub fn decode_public_id(raw: &str) -> String {
    raw.replace('~', "/")
}

pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// SHA-1 over the signed parameters sorted by name, joined as `k=v&k=v`,
/// followed directly by the API secret.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let payload = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    http: Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

impl CloudinaryClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(
        cloud_name: String,
        api_key: String,
        api_secret: SecretString,
    ) -> Result<Self, MediaError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            cloud_name,
            api_key,
            api_secret,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.cloud_name)
    }

    async fn check(res: Response) -> Result<Response, MediaError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let message = match res.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => status.to_string(),
        };
        Err(MediaError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload_image(&self, image: ImageUpload) -> Result<UploadedImage, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[
                ("folder", UPLOAD_FOLDER),
                ("timestamp", &timestamp),
                ("transformation", UPLOAD_TRANSFORMATION),
            ],
            self.api_secret.expose_secret(),
        );

        let size = image.bytes.len();
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.unwrap_or_else(|| "upload".to_string()))
            .mime_str(&image.content_type)
            .map_err(|e| MediaError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("transformation", UPLOAD_TRANSFORMATION)
            .text("signature", signature);

        let res = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let uploaded = Self::check(res)
            .await?
            .json::<UploadResponse>()
            .await
            .map_err(|e| MediaError::Serde(e.to_string()))?;

        debug!(public_id = %uploaded.public_id, bytes = size, "Uploaded image");
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete_image(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            self.api_secret.expose_secret(),
        );

        let res = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let destroyed = Self::check(res)
            .await?
            .json::<DestroyResponse>()
            .await
            .map_err(|e| MediaError::Serde(e.to_string()))?;

        if destroyed.result != "ok" {
            warn!(public_id, result = %destroyed.result, "CDN did not destroy image");
        }
        Ok(())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> MediaError {
    if e.is_timeout() {
        MediaError::Timeout
    } else {
        MediaError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn signature_sorts_params_and_appends_secret() {
        // Worked example from the CDN's signing documentation.
        let signature = sign(
            &[
                ("timestamp", "1315060510"),
                ("public_id", "sample_image"),
                ("eager", "w_400,h_300,c_pad|w_260,h_200,c_crop"),
            ],
            "abcd",
        );
        assert_eq!(signature, "bfd09f95f331f558cbd1320e67aa8d488770583e");
    }

    #[test]
    fn tilde_stands_for_slash() {
        assert_eq!(
            decode_public_id("construction-projects~abc123"),
            "construction-projects/abc123"
        );
        assert_eq!(decode_public_id("plain"), "plain");
    }

    #[test]
    fn only_images() {
        assert!(is_image("image/png"));
        assert!(is_image("image/webp"));
        assert!(!is_image("application/pdf"));
    }

    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaStore for CountingStore {
        async fn upload_image(&self, image: ImageUpload) -> Result<UploadedImage, MediaError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(UploadedImage {
                url: format!("https://cdn.test/{}", image.file_name.unwrap_or_default()),
                public_id: format!("{UPLOAD_FOLDER}/{n}"),
            })
        }

        async fn delete_image(&self, _public_id: &str) -> Result<(), MediaError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn upload_all_keeps_request_order() {
        let store = CountingStore {
            calls: AtomicUsize::new(0),
        };
        let images = ["a.jpg", "b.jpg"]
            .into_iter()
            .map(|name| ImageUpload {
                file_name: Some(name.to_string()),
                content_type: "image/jpeg".to_string(),
                bytes: Bytes::from_static(b"\xff\xd8"),
            })
            .collect();

        let uploaded = upload_all(&store, images).await.unwrap();
        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[0].url, "https://cdn.test/a.jpg");
        assert_eq!(uploaded[1].url, "https://cdn.test/b.jpg");
    }
}
