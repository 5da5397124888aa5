use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::blob::{BlobError, BlobStore};

/// Blob store over any `object_store` backend: S3, a local directory or memory.
pub struct ObjectStoreBlobs {
    inner: Arc<dyn ObjectStore>,
    location: String,
}

impl ObjectStoreBlobs {
    pub fn new(inner: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            inner,
            location: location.into(),
        }
    }

    /// S3 bucket, with region and credentials taken from the usual `AWS_*`
    /// environment variables.
    pub fn s3(bucket: &str) -> Result<Self, BlobError> {
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;

        Ok(Self::new(Arc::new(s3), format!("s3://{bucket}")))
    }

    /// Directory on the local filesystem, created if needed.
    pub fn local(root: impl AsRef<std::path::Path>) -> Result<Self, BlobError> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let fs = LocalFileSystem::new_with_prefix(root)?;

        Ok(Self::new(Arc::new(fs), root.display().to_string()))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }
}

impl BlobStore for ObjectStoreBlobs {
    fn location(&self) -> String {
        self.location.clone()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        match self.inner.get(&Path::from(key)).await {
            Ok(result) => Ok(Some(result.bytes().await?.to_vec())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), BlobError> {
        self.inner
            .put(&Path::from(key), PutPayload::from(body))
            .await?;
        Ok(())
    }
}
