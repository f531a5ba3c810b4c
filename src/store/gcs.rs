//! Unauthenticated Google Cloud Storage backend.
//!
//! Talks to the GCS JSON API directly over HTTPS. Create-if-absent maps to a
//! media upload with `ifGenerationMatch=0`; the 412 Precondition Failed the
//! server returns when the object already exists is the conflict signal.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::ObjectStore;
use super::ObjectStoreError;

const API_BASE: &str = "https://storage.googleapis.com";

/// [`ObjectStore`] over a single GCS bucket, without authentication.
///
/// Suitable for buckets whose ACLs grant the caller access without
/// credentials (the deployment this service targets).
pub struct GcsObjectStore {
    client: reqwest::Client,
    bucket: String,
}

impl GcsObjectStore {
    /// Create a client for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, location: &str) -> String {
        format!("{API_BASE}/storage/v1/b/{}/o/{}", self.bucket, encode_segment(location))
    }

    fn upload_url(&self, location: &str) -> String {
        format!(
            "{API_BASE}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            encode_segment(location)
        )
    }

    fn backend_error(&self, location: &str, reason: impl ToString) -> ObjectStoreError {
        ObjectStoreError::Backend {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Percent-encode a path segment.
///
/// Object names may contain `/` and other reserved characters, which the
/// JSON API requires encoded when the name appears in the URL path.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn get(&self, location: &str) -> Result<Bytes, ObjectStoreError> {
        let url = format!("{}?alt=media", self.object_url(location));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.backend_error(location, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound {
                location: location.to_string(),
            }),
            status if status.is_success() => {
                response.bytes().await.map_err(|e| self.backend_error(location, e))
            }
            status => Err(self.backend_error(location, format!("unexpected status {status}"))),
        }
    }

    async fn put(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
        let response = self
            .client
            .post(self.upload_url(location))
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.backend_error(location, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.backend_error(location, format!("upload failed with status {status}")))
        }
    }

    async fn create_if_absent(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
        let url = format!("{}&ifGenerationMatch=0", self.upload_url(location));
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.backend_error(location, e))?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED => Err(ObjectStoreError::AlreadyExists {
                location: location.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(self.backend_error(location, format!("conditional create failed with status {status}"))),
        }
    }

    async fn delete(&self, location: &str) -> Result<(), ObjectStoreError> {
        let response = self
            .client
            .delete(self.object_url(location))
            .send()
            .await
            .map_err(|e| self.backend_error(location, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound {
                location: location.to_string(),
            }),
            status if status.is_success() => Ok(()),
            status => Err(self.backend_error(location, format!("delete failed with status {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment_passes_unreserved() {
        assert_eq!(encode_segment("switcher.json"), "switcher.json");
        assert_eq!(encode_segment("a-b_c~d"), "a-b_c~d");
    }

    #[test]
    fn test_encode_segment_escapes_reserved() {
        assert_eq!(encode_segment("locks/increment.lock"), "locks%2Fincrement.lock");
        assert_eq!(encode_segment("a b"), "a%20b");
    }

    #[test]
    fn test_urls_embed_bucket_and_object() {
        let store = GcsObjectStore::new("demo-bucket");
        assert_eq!(
            store.object_url("switcher.json"),
            "https://storage.googleapis.com/storage/v1/b/demo-bucket/o/switcher.json"
        );
        assert_eq!(
            store.upload_url("increment.lock"),
            "https://storage.googleapis.com/upload/storage/v1/b/demo-bucket/o?uploadType=media&name=increment.lock"
        );
    }
}
