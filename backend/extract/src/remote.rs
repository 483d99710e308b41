//! Extraction delegated to an HTTP analysis service.
//!
//! The service receives the file as multipart field `file` and answers with
//! `{"features": {...}, "score": 0.0..1.0}`; `score` may be absent.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use dprscope_core::{DprError, DprResult, ExtractionResult, FeatureExtractor, FeatureSet};

pub struct RemoteExtractor {
    name: String,
    service: String,
    url: String,
    client: Client,
}

impl RemoteExtractor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> DprResult<Self> {
        let name = name.into();
        let service = format!("{name}-extractor");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DprError::Internal(format!("failed to build {service} client: {e}")))?;
        Ok(Self {
            service,
            name,
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn parse(&self, body: Value) -> DprResult<ExtractionResult> {
        let Value::Object(mut obj) = body else {
            return Err(DprError::upstream(&self.service, "response is not a JSON object"));
        };
        let features = match obj.remove("features") {
            Some(Value::Object(map)) => FeatureSet::from(map),
            Some(_) => return Err(DprError::upstream(&self.service, "'features' is not an object")),
            None => return Err(DprError::upstream(&self.service, "response has no 'features'")),
        };
        let score = obj.get("score").and_then(Value::as_f64);
        Ok(ExtractionResult { features, score })
    }
}

#[async_trait]
impl FeatureExtractor for RemoteExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, path: &Path) -> DprResult<ExtractionResult> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DprError::Internal(format!("cannot read staged upload {}: {e}", path.display())))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename));

        debug!(extractor = %self.name, url = %self.url, "Posting document to remote extractor");
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DprError::upstream(&self.service, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(extractor = %self.name, %status, "Remote extractor returned an error");
            return Err(DprError::upstream(&self.service, format!("HTTP {status}: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DprError::upstream(&self.service, format!("invalid JSON: {e}")))?;
        self.parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/extract")
    }

    async fn echo_size(mut multipart: Multipart) -> Json<Value> {
        let mut size = 0;
        let mut field_name = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            field_name = field.name().unwrap_or_default().to_string();
            size = field.bytes().await.unwrap().len();
        }
        Json(json!({
            "features": { "bytes": size, "field": field_name },
            "score": 0.6
        }))
    }

    fn staged_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("plan.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();
        path
    }

    #[tokio::test]
    async fn test_remote_extraction() {
        let url = serve(Router::new().route("/extract", post(echo_size))).await;
        let dir = tempfile::tempdir().unwrap();
        let path = staged_file(&dir);

        let extractor = RemoteExtractor::new("text", url, Duration::from_secs(5)).unwrap();
        let result = extractor.extract(&path).await.unwrap();
        assert_eq!(result.features.get("bytes"), Some(&json!(13)));
        assert_eq!(result.features.get("field"), Some(&json!("file")));
        assert_eq!(result.score, Some(0.6));
    }

    #[tokio::test]
    async fn test_remote_error_status() {
        let router = Router::new().route(
            "/extract",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let url = serve(router).await;
        let dir = tempfile::tempdir().unwrap();
        let path = staged_file(&dir);

        let err = RemoteExtractor::new("image", url, Duration::from_secs(5))
            .unwrap()
            .extract(&path)
            .await
            .unwrap_err();
        match err {
            DprError::Upstream { service, message } => {
                assert_eq!(service, "image-extractor");
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_requires_features() {
        let extractor = RemoteExtractor::new("text", "http://localhost:1", Duration::from_secs(1)).unwrap();
        assert!(extractor.parse(json!({"score": 0.4})).is_err());
        assert!(extractor.parse(json!({"features": [1, 2]})).is_err());

        let ok = extractor.parse(json!({"features": {"a": 1}})).unwrap();
        assert_eq!(ok.score, None);
        assert_eq!(ok.features.len(), 1);
    }
}
