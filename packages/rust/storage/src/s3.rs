//! S3-compatible asset store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, instrument};

use svedb_shared::{MirrorCredentials, Result, SvedbError};

use crate::{AssetStore, IMAGE_CONTENT_TYPE};

/// Page size requested from `ListObjectsV2`.
const LIST_PAGE_SIZE: i32 = 1000;

/// Asset store backed by one S3 bucket.
#[derive(Debug, Clone)]
pub struct S3AssetStore {
    name: String,
    client: Client,
    bucket: String,
}

impl S3AssetStore {
    /// Create a store for `bucket`.
    ///
    /// Uses path-style addressing, and only computes checksums where the
    /// operation requires one, so R2 and MinIO accept uploads.
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "svedb-config");
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);
        if let Some(endpoint_url) = endpoint {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self {
            name: format!("s3://{bucket}"),
            client: Client::from_conf(builder.build()),
            bucket,
        }
    }

    /// Create a store from resolved mirror credentials.
    pub fn from_credentials(
        bucket: impl Into<String>,
        region: impl Into<String>,
        credentials: MirrorCredentials,
    ) -> Self {
        Self::new(
            bucket,
            region,
            credentials.endpoint,
            credentials.access_key,
            credentials.secret_key,
        )
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(bucket = %self.bucket))]
    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .max_keys(LIST_PAGE_SIZE)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    SvedbError::Storage(format!(
                        "listing {} failed: {}",
                        self.bucket,
                        DisplayErrorContext(&e)
                    ))
                })?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(keys = keys.len(), "bucket listed");
        Ok(keys)
    }

    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(IMAGE_CONTENT_TYPE)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                SvedbError::Storage(format!("upload of {key} failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(keys: &[&str], next: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{key}</Key><Size>4</Size></Contents>"))
            .collect();
        let truncation = match next {
            Some(token) => format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
            ),
            None => "<IsTruncated>false</IsTruncated>".to_string(),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>evolvecdb</Name><Prefix></Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>{truncation}{contents}</ListBucketResult>"#,
            keys.len()
        )
    }

    fn xml(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "application/xml")
    }

    fn store_at(server: &MockServer) -> S3AssetStore {
        S3AssetStore::new("evolvecdb", "auto", Some(server.uri()), "key", "secret")
    }

    #[tokio::test]
    async fn list_follows_continuation_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/evolvecdb"))
            .and(query_param("list-type", "2"))
            .and(query_param_is_missing("continuation-token"))
            .respond_with(xml(listing(&["BP01-001EN.png", "BP01-002EN.png"], Some("page-2"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/evolvecdb"))
            .and(query_param("continuation-token", "page-2"))
            .respond_with(xml(listing(&["BP08-SL03_URAEN.png"], None)))
            .expect(1)
            .mount(&server)
            .await;

        let keys = store_at(&server).list_keys().await.unwrap();

        assert_eq!(keys, ["BP01-001EN.png", "BP01-002EN.png", "BP08-SL03_URAEN.png"]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_bucket_lists_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/evolvecdb"))
            .respond_with(xml(listing(&[], None)))
            .mount(&server)
            .await;

        assert!(store_at(&server).list_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_sends_png_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/evolvecdb/BP01-001EN.png"))
            .and(header("content-type", IMAGE_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        store_at(&server)
            .put("BP01-001EN.png", vec![0x89, b'P', b'N', b'G'])
            .await
            .unwrap();
    }

    #[test]
    fn name_includes_bucket() {
        let store = S3AssetStore::new(
            "evolvecdb",
            "auto",
            Some("https://account.r2.cloudflarestorage.com"),
            "key",
            "secret",
        );
        assert_eq!(store.name(), "s3://evolvecdb");
    }

    #[test]
    fn builds_from_credentials_without_endpoint() {
        let credentials = MirrorCredentials {
            endpoint: None,
            access_key: "key".into(),
            secret_key: "secret".into(),
        };
        let store = S3AssetStore::from_credentials("bucket", "us-east-1", credentials);
        assert_eq!(store.bucket, "bucket");
    }
}
