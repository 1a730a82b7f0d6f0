use crate::config::{Config, DisplayConfig};
use crate::detector::{DetectionError, DetectionParams, LabelDetector, RekognitionDetector};
use crate::fetcher::{fetch, FetchError, ImageStore, S3ImageStore};
use crate::label::{ImageRef, Label};
use crate::render::{render, window_title, DisplaySink, HighGuiWindow, JpegFile, RenderError};
use aws_config::{BehaviorVersion, Region};

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    Completed { annotations: usize },
    NoLabels,
    DetectionFailed(DetectionError),
    FetchFailed(FetchError),
    RenderFailed(RenderError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Completed { .. } | Outcome::NoLabels)
    }

    pub fn status_line(&self) -> &'static str {
        match self {
            Outcome::Completed { .. } | Outcome::NoLabels => "Workflow completed successfully!",
            Outcome::DetectionFailed(_) => {
                "Workflow failed due to Rekognition error. Please check messages above."
            }
            Outcome::FetchFailed(_) => {
                "Workflow failed while downloading the image. Please check messages above."
            }
            Outcome::RenderFailed(_) => {
                "Workflow failed while rendering the labels. Please check messages above."
            }
        }
    }
}

pub struct App<D: LabelDetector, S: ImageStore, V: DisplaySink> {
    detector: D,
    store: S,
    display: V,
    image: ImageRef,
    params: DetectionParams,
}

impl<D: LabelDetector, S: ImageStore, V: DisplaySink> App<D, S, V> {
    pub fn new(
        detector: D,
        store: S,
        display: V,
        image: ImageRef,
        params: DetectionParams,
    ) -> Self {
        Self {
            detector,
            store,
            display,
            image,
            params,
        }
    }

    /// Runs the label detection; any failure is logged and yields `Err`.
    pub async fn detect(&self) -> Result<Vec<Label>, DetectionError> {
        tracing::info!(
            "Analyzing image '{}' from bucket '{}' with Rekognition...",
            self.image.key,
            self.image.bucket
        );

        match self.detector.detect(&self.image, self.params).await {
            Ok(labels) => {
                tracing::info!("Label detection successful.");
                Ok(labels)
            }
            Err(e) => {
                tracing::error!("{}", e);
                Err(e)
            }
        }
    }

    pub async fn run(&mut self) -> Outcome {
        let labels = match self.detect().await {
            Ok(labels) => labels,
            Err(e) => return Outcome::DetectionFailed(e),
        };

        if labels.is_empty() {
            tracing::info!("No labels found or invalid Rekognition response.");
            return Outcome::NoLabels;
        }

        let image = match fetch(&self.store, &self.image).await {
            Ok(image) => {
                tracing::info!("Image '{}' downloaded successfully from S3.", self.image.key);
                image
            }
            Err(e) => {
                tracing::error!(
                    "Error downloading image from S3: {}. Check S3 bucket name, key, and permissions.",
                    e
                );
                return Outcome::FetchFailed(e);
            }
        };

        let title = window_title(self.image.file_name());
        match render(image, &labels, &title, &mut self.display) {
            Ok(annotations) => Outcome::Completed { annotations },
            Err(e) => {
                tracing::error!("Error rendering labels: {}", e);
                Outcome::RenderFailed(e)
            }
        }
    }
}

fn display_sinks(config: &DisplayConfig) -> Vec<Box<dyn DisplaySink + Send>> {
    let mut sinks: Vec<Box<dyn DisplaySink + Send>> = Vec::new();
    if let Some(path) = &config.output_path {
        sinks.push(Box::new(JpegFile { path: path.clone() }));
    }
    if config.window {
        sinks.push(Box::new(HighGuiWindow));
    }
    sinks
}

pub async fn start_app(config: Config) -> anyhow::Result<Outcome> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;

    let detector = RekognitionDetector::new(aws_sdk_rekognition::Client::new(&sdk_config));
    let store = S3ImageStore::new(aws_sdk_s3::Client::new(&sdk_config));
    let params = DetectionParams {
        max_labels: config.detection.max_labels,
        min_confidence: config.detection.min_confidence,
    };

    let mut app = App::new(
        detector,
        store,
        display_sinks(&config.display),
        config.image.image_ref(),
        params,
    );

    tracing::info!("Starting Image Label Generator workflow...");
    let outcome = app.run().await;
    println!("\n{}", outcome.status_line());

    Ok(outcome)
}
