use crate::label::{BoundingBox, ImageRef, Label};
use async_trait::async_trait;
use aws_sdk_rekognition::{
    error::DisplayErrorContext,
    operation::detect_labels::{DetectLabelsError, DetectLabelsOutput},
    types::{Image, S3Object},
    Client,
};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Error: The image format is not supported by Rekognition.")]
    InvalidImageFormat,
    #[error(
        "Error: The S3 object '{key}' in bucket '{bucket}' could not be accessed or does not exist. Check bucket name, key, and permissions."
    )]
    InvalidObject { bucket: String, key: String },
    #[error("An unexpected error occurred during Rekognition analysis: {0}")]
    Service(String),
}

#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub max_labels: i32,
    pub min_confidence: f32,
}

#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect(
        &self,
        image: &ImageRef,
        params: DetectionParams,
    ) -> Result<Vec<Label>, DetectionError>;
}

pub struct RekognitionDetector {
    client: Client,
}

impl RekognitionDetector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LabelDetector for RekognitionDetector {
    #[instrument(skip(self))]
    async fn detect(
        &self,
        image: &ImageRef,
        params: DetectionParams,
    ) -> Result<Vec<Label>, DetectionError> {
        let s3_object = S3Object::builder()
            .bucket(&image.bucket)
            .name(&image.key)
            .build();

        let output = self
            .client
            .detect_labels()
            .image(Image::builder().s3_object(s3_object).build())
            .max_labels(params.max_labels)
            .min_confidence(params.min_confidence)
            .send()
            .await
            .map_err(|err| classify_error(image, err.into_service_error()))?;

        Ok(labels_from_output(output, params))
    }
}

fn classify_error(image: &ImageRef, err: DetectLabelsError) -> DetectionError {
    if err.is_invalid_image_format_exception() {
        DetectionError::InvalidImageFormat
    } else if err.is_invalid_s3_object_exception() {
        DetectionError::InvalidObject {
            bucket: image.bucket.clone(),
            key: image.key.clone(),
        }
    } else {
        DetectionError::Service(DisplayErrorContext(&err).to_string())
    }
}

/// Converts the service response, keeping the service's ordering. Labels
/// below `min_confidence` or past `max_labels` are dropped, as are instances
/// that carry no bounding box.
pub(crate) fn labels_from_output(
    output: DetectLabelsOutput,
    params: DetectionParams,
) -> Vec<Label> {
    let max_labels = usize::try_from(params.max_labels.max(1)).unwrap_or(1);

    output
        .labels
        .unwrap_or_default()
        .into_iter()
        .filter_map(|label| {
            let confidence = label.confidence.unwrap_or_default();
            if !(0.0..=100.0).contains(&confidence) || confidence < params.min_confidence {
                tracing::debug!(
                    "Dropping label {:?} with confidence {}",
                    label.name,
                    confidence
                );
                return None;
            }

            let instances = label
                .instances
                .unwrap_or_default()
                .into_iter()
                .filter_map(|instance| instance.bounding_box)
                .map(|bbox| BoundingBox {
                    left: bbox.left.unwrap_or_default(),
                    top: bbox.top.unwrap_or_default(),
                    width: bbox.width.unwrap_or_default(),
                    height: bbox.height.unwrap_or_default(),
                })
                .collect();

            let parents = label
                .parents
                .unwrap_or_default()
                .into_iter()
                .filter_map(|parent| parent.name)
                .collect();

            Some(Label {
                name: label.name.unwrap_or_default(),
                confidence,
                instances,
                parents,
            })
        })
        .take(max_labels)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rekognition::types::{
        self as rk,
        error::{InvalidImageFormatException, InvalidS3ObjectException, ThrottlingException},
        Instance, Parent,
    };

    fn params() -> DetectionParams {
        DetectionParams {
            max_labels: 3,
            min_confidence: 75.0,
        }
    }

    fn label(name: &str, confidence: f32) -> rk::Label {
        rk::Label::builder().name(name).confidence(confidence).build()
    }

    #[test]
    fn test_labels_respect_bounds() {
        let output = DetectLabelsOutput::builder()
            .labels(label("Car", 99.1))
            .labels(label("Blurry", 40.0))
            .labels(label("Road", 92.0))
            .labels(label("Vehicle", 88.5))
            .labels(label("Transportation", 80.0))
            .build();

        let labels = labels_from_output(output, params());

        assert_eq!(labels.len(), 3);
        for label in &labels {
            assert!(label.confidence >= 75.0 && label.confidence <= 100.0);
        }
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Car", "Road", "Vehicle"]);
    }

    #[test]
    fn test_instances_and_parents_converted() {
        let bbox = rk::BoundingBox::builder()
            .left(0.1)
            .top(0.2)
            .width(0.3)
            .height(0.4)
            .build();
        let output = DetectLabelsOutput::builder()
            .labels(
                rk::Label::builder()
                    .name("Dog")
                    .confidence(97.0)
                    .instances(Instance::builder().bounding_box(bbox).confidence(97.0).build())
                    .instances(Instance::builder().confidence(60.0).build())
                    .parents(Parent::builder().name("Animal").build())
                    .build(),
            )
            .build();

        let labels = labels_from_output(output, params());

        assert_eq!(labels.len(), 1);
        assert_eq!(
            labels[0].instances,
            vec![BoundingBox {
                left: 0.1,
                top: 0.2,
                width: 0.3,
                height: 0.4
            }]
        );
        assert_eq!(labels[0].parents, vec!["Animal".to_string()]);
    }

    #[test]
    fn test_empty_response() {
        let output = DetectLabelsOutput::builder().build();
        assert!(labels_from_output(output, params()).is_empty());
    }

    #[test]
    fn test_access_error_message() {
        let err = DetectionError::InvalidObject {
            bucket: "my-bucket".to_string(),
            key: "images/missing.jpg".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error: The S3 object 'images/missing.jpg' in bucket 'my-bucket' could not be accessed or does not exist. Check bucket name, key, and permissions."
        );
    }

    fn image_ref() -> ImageRef {
        ImageRef::new("my-bucket", "images/missing.jpg")
    }

    #[test]
    fn test_invalid_format_classified() {
        let err = DetectLabelsError::InvalidImageFormatException(
            InvalidImageFormatException::builder()
                .message("Request has invalid image format")
                .build(),
        );

        let classified = classify_error(&image_ref(), err);

        assert!(matches!(classified, DetectionError::InvalidImageFormat));
        assert_eq!(
            classified.to_string(),
            "Error: The image format is not supported by Rekognition."
        );
    }

    #[test]
    fn test_invalid_s3_object_classified() {
        let err = DetectLabelsError::InvalidS3ObjectException(
            InvalidS3ObjectException::builder()
                .message("Unable to get object metadata from S3")
                .build(),
        );

        match classify_error(&image_ref(), err) {
            DetectionError::InvalidObject { bucket, key } => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(key, "images/missing.jpg");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_other_service_errors_classified() {
        let err = DetectLabelsError::ThrottlingException(
            ThrottlingException::builder().message("Slow down").build(),
        );

        let classified = classify_error(&image_ref(), err);

        match &classified {
            DetectionError::Service(message) => assert!(message.contains("Slow down")),
            other => panic!("unexpected classification: {:?}", other),
        }
        assert!(classified
            .to_string()
            .starts_with("An unexpected error occurred during Rekognition analysis: "));
    }
}
