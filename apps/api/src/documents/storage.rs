//! Object storage for uploaded documents.
//!
//! `AppState` holds an `Arc<dyn DocumentStorage>`; production uses S3 (or a
//! MinIO endpoint), tests swap in an in-memory store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

const KEY_PREFIX: &str = "documents";
const MAX_NAME_LEN: usize = 100;

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Stores `body` under `key` and returns the URL clients can fetch it from.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct S3DocumentStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    endpoint: String,
}

impl S3DocumentStorage {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, endpoint: &str) -> Self {
        Self {
            client,
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl DocumentStorage for S3DocumentStorage {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(self.object_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// `documents/{user_id}/{uuid}-{sanitised file name}`
pub fn object_key(user_id: i64, file_name: &str) -> String {
    format!(
        "{KEY_PREFIX}/{user_id}/{}-{}",
        Uuid::new_v4(),
        sanitise_file_name(file_name)
    )
}

/// True when `path` is an object this service uploaded for `user_id`.
pub fn owns_path(user_id: i64, path: &str) -> bool {
    path.starts_with(&format!("{KEY_PREFIX}/{user_id}/"))
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitise_file_name(name: &str) -> String {
    // Browsers may send a full client-side path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2.25 MB`.
pub fn format_file_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
