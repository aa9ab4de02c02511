use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::Json as ResponseJson,
    routing::post,
    Json, Router,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::analysis::{profile, Recommender};
use crate::dataset::{load_upload, Dataset};
use crate::models::{AppState, UploadResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload_file))
        .with_state(state)
}

async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<ResponseJson<UploadResponse>> {
    let request_id = Uuid::new_v4();

    async move {
        let multipart = multipart.map_err(|e| AppError::MissingField(format!("file ({})", e.body_text())))?;
        let (filename, content) = read_file_field(multipart).await?;
        info!(filename = %filename, size = content.len(), "Received upload");

        let dataset = load_upload(&filename, &content)?;
        let response = recommend_dataset(&state.recommender, &dataset).await?;
        Ok(Json(response))
    }
    .instrument(info_span!("upload", %request_id))
    .await
}

/// Profile a loaded dataset and attach chart suggestions, as returned by
/// `POST /upload`.
pub async fn recommend_dataset(recommender: &Recommender, dataset: &Dataset) -> AppResult<UploadResponse> {
    let profile = profile(dataset)?;
    let data_info = profile.data_info();
    let recommendation = recommender.recommend_for(&profile).await;

    info!(
        rows = data_info.row_count,
        columns = data_info.column_count,
        charts = recommendation.charts.len(),
        source = ?recommendation.source,
        "Chart suggestions ready"
    );

    Ok(UploadResponse {
        status: "success".to_string(),
        data_info,
        chart_suggestions: recommendation.charts,
        suggestion_source: recommendation.source,
    })
}

async fn read_file_field(mut multipart: Multipart) -> AppResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(multipart_error)?;
        return Ok((filename, content));
    }

    Err(AppError::MissingField("file".to_string()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidRequest(err.body_text())
    }
}
