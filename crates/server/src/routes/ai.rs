use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use deployment::Deployment;
use services::services::assistant::{AskBody, AskResponse, ChatBody, ChatResponse};
use utils::response::ApiResponse;

use crate::{error::ApiError, middleware::validation::ValidJson};

pub async fn ask(
    State(deployment): State<Deployment>,
    ValidJson(body): ValidJson<AskBody>,
) -> Result<ResponseJson<ApiResponse<AskResponse>>, ApiError> {
    let answer = deployment.assistant().ask(body).await?;
    Ok(ResponseJson(ApiResponse::success(answer)))
}

pub async fn chat(
    State(deployment): State<Deployment>,
    ValidJson(body): ValidJson<ChatBody>,
) -> Result<ResponseJson<ApiResponse<ChatResponse>>, ApiError> {
    let reply = deployment.assistant().chat(body).await?;
    Ok(ResponseJson(ApiResponse::success(reply)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/ai",
        Router::new()
            .route("/ask", post(ask))
            .route("/chat", post(chat)),
    )
}
