use crate::cv_utils::{CvImage, CvUtilsError};
use crate::label::ImageRef;
use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, Client};
use bytes::Bytes;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to download s3://{bucket}/{key}: {message}")]
    Download {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("failed to read object body: {0}")]
    Read(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] CvUtilsError),
}

/// Read access to the object store holding the image.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn get_object(&self, image: &ImageRef) -> Result<Bytes, FetchError>;
}

pub struct S3ImageStore {
    client: Client,
}

impl S3ImageStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    #[instrument(skip(self))]
    async fn get_object(&self, image: &ImageRef) -> Result<Bytes, FetchError> {
        let object = self
            .client
            .get_object()
            .bucket(&image.bucket)
            .key(&image.key)
            .send()
            .await
            .map_err(|err| FetchError::Download {
                bucket: image.bucket.clone(),
                key: image.key.clone(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|err| FetchError::Read(err.to_string()))?;

        Ok(body.into_bytes())
    }
}

/// Downloads the whole object and decodes it into a bitmap.
pub async fn fetch<S: ImageStore + ?Sized>(
    store: &S,
    image: &ImageRef,
) -> Result<CvImage, FetchError> {
    let bytes = store.get_object(image).await?;
    tracing::debug!(
        "Downloaded {} bytes from s3://{}/{}",
        bytes.len(),
        image.bucket,
        image.key
    );

    let decoded = CvImage::from_bytes(bytes)?;
    Ok(decoded)
}
