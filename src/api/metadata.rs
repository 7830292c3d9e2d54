use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::middleware::CurrentUser;
use crate::error::AppError;
use crate::metadata::fetcher::{MetadataFetcher, UrlMetadata};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractMetadataRequest {
    #[serde(default)]
    pub url: String,
}

/// Preview what saving `url` would prefill.
pub async fn process_extract_metadata(
    fetcher: &dyn MetadataFetcher,
    request: ExtractMetadataRequest,
) -> Result<UrlMetadata, AppError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("URL is required".into()));
    }
    Ok(fetcher.fetch(url).await)
}

/// Axum handler for `POST /api/extract-metadata`.
pub async fn extract_metadata_handler(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(request): Json<ExtractMetadataRequest>,
) -> Result<Json<UrlMetadata>, AppError> {
    let metadata = process_extract_metadata(state.metadata.as_ref(), request).await?;
    Ok(Json(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct UrlOnly;

    #[async_trait]
    impl MetadataFetcher for UrlOnly {
        async fn fetch(&self, url: &str) -> UrlMetadata {
            UrlMetadata::fallback(url)
        }
    }

    #[tokio::test]
    async fn test_empty_url_rejected() {
        let result = process_extract_metadata(
            &UrlOnly,
            ExtractMetadataRequest {
                url: "  ".to_string(),
            },
        )
        .await;
        match result {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "URL is required"),
            other => panic!("Expected BadRequest, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_url_is_trimmed() {
        let metadata = process_extract_metadata(
            &UrlOnly,
            ExtractMetadataRequest {
                url: " https://www.tiktok.com/@someone/video/1 ".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(metadata.title, "https://www.tiktok.com/@someone/video/1");
        assert_eq!(metadata.platform, "TikTok");
    }
}
