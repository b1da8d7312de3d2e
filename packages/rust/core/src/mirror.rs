//! Copy card images from the site into the asset store, once per identifier.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use svedb_crawler::SiteClient;
use svedb_shared::{IMAGE_EXTENSION, MirroredAssetIndex, RawRecord};
use svedb_storage::AssetStore;

/// What [`AssetMirror::mirror`] did for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The identifier was already in the store at run start.
    Skipped,
    /// Images were fetched and put; `files` counts successful uploads.
    Uploaded { files: usize },
}

/// Snapshot the store's keys.
///
/// A failed listing is logged and yields an empty index, so every record
/// is uploaded again.
pub async fn list_existing(store: &dyn AssetStore) -> MirroredAssetIndex {
    match store.list_keys().await {
        Ok(keys) => {
            let index = MirroredAssetIndex::from_keys(keys);
            info!(store = store.name(), existing = index.len(), "asset store listed");
            index
        }
        Err(e) => {
            warn!(store = store.name(), error = %e, "asset listing failed, assuming empty store");
            MirroredAssetIndex::default()
        }
    }
}

/// Mirrors record images into an [`AssetStore`].
///
/// The index is taken once when the mirror is opened and never updated, so
/// a record seen twice in one run may be uploaded twice.
pub struct AssetMirror {
    site: SiteClient,
    store: Arc<dyn AssetStore>,
    index: MirroredAssetIndex,
}

impl AssetMirror {
    /// List the store and build a mirror over that snapshot.
    pub async fn open(site: SiteClient, store: Arc<dyn AssetStore>) -> Self {
        let index = list_existing(store.as_ref()).await;
        Self { site, store, index }
    }

    pub fn index(&self) -> &MirroredAssetIndex {
        &self.index
    }

    /// Upload the record's primary image, and its secondary image when it has
    /// one, unless the identifier is already mirrored.
    ///
    /// Never fails: fetch and upload errors are logged and skipped.
    #[instrument(skip_all, fields(record = %record.id))]
    pub async fn mirror(&self, record: &RawRecord) -> MirrorOutcome {
        if self.index.covers(&record.id) {
            debug!("already mirrored");
            return MirrorOutcome::Skipped;
        }

        let mut files = 0;

        let key = format!("{}.{IMAGE_EXTENSION}", record.id);
        if self.copy(&record.img, &key).await {
            files += 1;
        }

        if let (Some(path), Some(key)) = (record.alt_image_path(), record.alt_image_file()) {
            if self.copy(path, key).await {
                files += 1;
            }
        }

        MirrorOutcome::Uploaded { files }
    }

    /// Fetch `img_path` from the site and put it under `key`.
    async fn copy(&self, img_path: &str, key: &str) -> bool {
        let bytes = match self.site.fetch_image(img_path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(img = img_path, "image not available, skipping upload");
                return false;
            }
            Err(e) => {
                warn!(img = img_path, error = %e, "image fetch failed, skipping upload");
                return false;
            }
        };

        match self.store.put(key, bytes).await {
            Ok(()) => {
                info!(key, "image uploaded");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "image upload failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;
    use svedb_shared::FaceParams;
    use svedb_storage::MemoryAssetStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];

    fn record(id: &str, alt_img: Option<&str>) -> RawRecord {
        let segment = id.split('-').next().unwrap();
        RawRecord {
            id: id.into(),
            img: format!("{segment}/{id}.png"),
            faces: FaceParams {
                double_sided: alt_img.is_some(),
                alt_name: None,
                alt_img: alt_img.map(str::to_string),
            },
            ..RawRecord::default()
        }
    }

    async fn mount_image(server: &MockServer, img: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/wordpress/wp-content/images/cardlist/{img}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG.to_vec()))
            .mount(server)
            .await;
    }

    async fn open(server: &MockServer, store: Arc<MemoryAssetStore>) -> AssetMirror {
        let site = SiteClient::new(test_config(&server.uri())).unwrap();
        AssetMirror::open(site, store).await
    }

    #[tokio::test]
    async fn existing_key_skips_without_requests() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryAssetStore::with_keys(["bp01-001en.png"]));
        let mirror = open(&server, store.clone()).await;

        let outcome = mirror.mirror(&record("BP01-001EN", None)).await;

        assert_eq!(outcome, MirrorOutcome::Skipped);
        assert_eq!(store.put_count(), 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn uploads_primary_and_secondary_images() {
        let server = MockServer::start().await;
        mount_image(&server, "BP08/BP08-SL03EN.png").await;
        mount_image(&server, "BP08/BP08-SL03_URAEN.png").await;

        let store = Arc::new(MemoryAssetStore::new());
        let mirror = open(&server, store.clone()).await;

        let outcome = mirror
            .mirror(&record("BP08-SL03EN", Some("BP08/BP08-SL03_URAEN.png")))
            .await;

        assert_eq!(outcome, MirrorOutcome::Uploaded { files: 2 });
        assert_eq!(store.get("BP08-SL03EN.png").await.as_deref(), Some(PNG));
        assert_eq!(store.get("BP08-SL03_URAEN.png").await.as_deref(), Some(PNG));
    }

    #[tokio::test]
    async fn missing_image_is_skipped() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryAssetStore::new());
        let mirror = open(&server, store.clone()).await;

        let outcome = mirror.mirror(&record("BP01-002EN", None)).await;

        assert_eq!(outcome, MirrorOutcome::Uploaded { files: 0 });
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn upload_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount_image(&server, "BP01/BP01-003EN.png").await;

        let store = Arc::new(MemoryAssetStore::new());
        store.fail_puts(true);
        let mirror = open(&server, store.clone()).await;

        let outcome = mirror.mirror(&record("BP01-003EN", None)).await;
        assert_eq!(outcome, MirrorOutcome::Uploaded { files: 0 });
    }

    #[tokio::test]
    async fn failed_listing_yields_empty_index() {
        let store = MemoryAssetStore::with_keys(["BP01-001EN.png"]);
        store.fail_list(true);

        let index = list_existing(&store).await;
        assert!(index.is_empty());
    }
}
