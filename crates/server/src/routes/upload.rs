use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, post},
};
use deployment::Deployment;
use serde::Serialize;
use services::services::media::{
    self, ImageUpload, MAX_IMAGE_BYTES, MAX_IMAGES_PER_REQUEST, UploadedImage,
};
use tracing::{debug, info};
use ts_rs::TS;
use utils::response::{ApiResponse, Notice};

use crate::{
    error::ApiError,
    middleware::auth::{RequireRole, StaffOrAdmin},
};

/// Room for a full batch plus multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGES_PER_REQUEST * MAX_IMAGE_BYTES + 64 * 1024;

#[derive(Debug, Serialize, TS)]
pub struct SingleUpload {
    pub message: &'static str,
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Serialize, TS)]
pub struct BatchUpload {
    pub message: &'static str,
    pub images: Vec<UploadedImage>,
}

fn unreadable_form(rejection: MultipartRejection) -> ApiError {
    debug!(detail = %rejection.body_text(), "Rejected multipart request");
    ApiError::Validation("body: Expected multipart form data".to_string())
}

fn unreadable_part(error: MultipartError) -> ApiError {
    debug!(detail = %error.body_text(), "Unreadable multipart part");
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Validation("File too large".to_string())
    } else {
        ApiError::Validation("body: Malformed multipart form data".to_string())
    }
}

/// Reads every file sent under `field`. Other fields are skipped.
async fn collect_images(
    multipart: &mut Multipart,
    field: &str,
    max_files: usize,
) -> Result<Vec<ImageUpload>, ApiError> {
    let mut images = Vec::new();
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(unreadable_part)?
    {
        if part.name() != Some(field) {
            continue;
        }
        if images.len() == max_files {
            return Err(ApiError::Validation("Too many files".to_string()));
        }

        let content_type = part.content_type().unwrap_or_default().to_string();
        if !media::is_image(&content_type) {
            return Err(ApiError::Validation(
                "Only image files are allowed".to_string(),
            ));
        }
        let file_name = part.file_name().map(str::to_string);
        let bytes = part.bytes().await.map_err(unreadable_part)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::Validation("File too large".to_string()));
        }

        images.push(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(images)
}

pub async fn upload_image(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ResponseJson<ApiResponse<SingleUpload>>, ApiError> {
    let mut multipart = multipart.map_err(unreadable_form)?;
    let image = collect_images(&mut multipart, "image", 1)
        .await?
        .pop()
        .ok_or_else(|| ApiError::Validation("No image file provided".to_string()))?;

    let uploaded = deployment
        .media()
        .upload_image(image)
        .await
        .map_err(|e| ApiError::downstream("Failed to upload image", e))?;
    info!(public_id = %uploaded.public_id, "Image uploaded");

    Ok(ResponseJson(ApiResponse::success(SingleUpload {
        message: "Image uploaded successfully",
        url: uploaded.url,
        public_id: uploaded.public_id,
    })))
}

pub async fn upload_images(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ResponseJson<ApiResponse<BatchUpload>>, ApiError> {
    let mut multipart = multipart.map_err(unreadable_form)?;
    let images = collect_images(&mut multipart, "images", MAX_IMAGES_PER_REQUEST).await?;
    if images.is_empty() {
        return Err(ApiError::Validation("No images provided".to_string()));
    }

    let uploaded = media::upload_all(deployment.media(), images)
        .await
        .map_err(|e| ApiError::downstream("Failed to upload images", e))?;
    info!(count = uploaded.len(), "Images uploaded");

    Ok(ResponseJson(ApiResponse::success(BatchUpload {
        message: "Images uploaded successfully",
        images: uploaded,
    })))
}

/// `public_id` uses `~` in place of `/`.
pub async fn delete_image(
    State(deployment): State<Deployment>,
    _staff: RequireRole<StaffOrAdmin>,
    Path(public_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Notice<()>>>, ApiError> {
    let public_id = media::decode_public_id(&public_id);
    deployment
        .media()
        .delete_image(&public_id)
        .await
        .map_err(|e| ApiError::downstream("Failed to delete image", e))?;
    info!(public_id = %public_id, "Image deleted");

    Ok(ResponseJson(ApiResponse::success(Notice::message(
        "Image deleted successfully",
    ))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/upload",
        Router::new()
            .route("/image", post(upload_image))
            .route("/images", post(upload_images))
            .route("/image/{public_id}", delete(delete_image))
            .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
}
