use crate::annotation::layout;
use crate::cv_utils::{CvImage, CvUtilsError};
use crate::label::Label;
use opencv::highgui;
use std::path::PathBuf;
use thiserror::Error;

const KEY_POLL_MS: i32 = 100;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to draw annotations: {0}")]
    Draw(#[from] CvUtilsError),
    #[error("failed to display image: {0}")]
    Display(#[from] opencv::Error),
    #[error("failed to write annotated image to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for the finished, annotated image.
pub trait DisplaySink {
    fn show(&mut self, title: &str, image: &CvImage) -> Result<(), RenderError>;
}

/// Blocking HighGUI window; returns once a key is pressed or the window is closed.
pub struct HighGuiWindow;

impl DisplaySink for HighGuiWindow {
    fn show(&mut self, title: &str, image: &CvImage) -> Result<(), RenderError> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        highgui::imshow(title, &image.mat)?;

        loop {
            if highgui::wait_key(KEY_POLL_MS)? >= 0 {
                break;
            }
            if highgui::get_window_property(title, highgui::WND_PROP_VISIBLE)? < 1.0 {
                break;
            }
        }

        highgui::destroy_window(title)?;
        Ok(())
    }
}

pub struct JpegFile {
    pub path: PathBuf,
}

impl DisplaySink for JpegFile {
    fn show(&mut self, _title: &str, image: &CvImage) -> Result<(), RenderError> {
        let jpg = image.to_jpg()?;
        std::fs::write(&self.path, jpg).map_err(|source| RenderError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!("Annotated image written to {:?}", self.path);
        Ok(())
    }
}

impl DisplaySink for Vec<Box<dyn DisplaySink + Send>> {
    fn show(&mut self, title: &str, image: &CvImage) -> Result<(), RenderError> {
        for sink in self.iter_mut() {
            sink.show(title, image)?;
        }
        Ok(())
    }
}

pub fn window_title(file_name: &str) -> String {
    format!("Labels for: {}", file_name)
}

/// Prints the label list, draws one box and caption per instance and hands
/// the result to `display`. Returns the number of annotations drawn.
pub fn render<D: DisplaySink + ?Sized>(
    mut image: CvImage,
    labels: &[Label],
    title: &str,
    display: &mut D,
) -> Result<usize, RenderError> {
    if labels.is_empty() {
        tracing::info!("No labels found or invalid Rekognition response.");
        return Ok(0);
    }

    println!("\n--- Detected Labels ---");
    for label in labels {
        println!("  - {} (Confidence: {}%)", label.name, label.rounded_confidence());
        if label.is_scene_level() {
            tracing::debug!("Scene-level label {} has no bounding box to draw", label.name);
        }
    }

    let annotations = layout(labels, image.width(), image.height());
    image.annotate(&annotations)?;
    display.show(title, &image)?;

    Ok(annotations.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::label::BoundingBox;
    use opencv::core::{Mat, Scalar, CV_8UC3};

    /// Records what would have been shown instead of opening a window.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub shown: Vec<(String, u32, u32)>,
    }

    impl DisplaySink for RecordingSink {
        fn show(&mut self, title: &str, image: &CvImage) -> Result<(), RenderError> {
            self.shown.push((title.to_string(), image.width(), image.height()));
            Ok(())
        }
    }

    fn blank(width: i32, height: i32) -> CvImage {
        CvImage {
            mat: Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))
                .unwrap(),
        }
    }

    #[test]
    fn test_empty_labels_skip_display() {
        let mut sink = RecordingSink::default();
        let drawn = render(blank(10, 10), &[], "Labels for: a.jpg", &mut sink).unwrap();

        assert_eq!(drawn, 0);
        assert!(sink.shown.is_empty());
    }

    #[test]
    fn test_render_counts_instances() {
        let labels = vec![
            Label {
                name: "Dog".to_string(),
                confidence: 97.0,
                instances: vec![
                    BoundingBox {
                        left: 0.1,
                        top: 0.1,
                        width: 0.3,
                        height: 0.3,
                    },
                    BoundingBox {
                        left: 0.5,
                        top: 0.5,
                        width: 0.3,
                        height: 0.3,
                    },
                ],
                parents: vec!["Animal".to_string()],
            },
            Label {
                name: "Grass".to_string(),
                confidence: 88.0,
                instances: vec![],
                parents: vec![],
            },
        ];
        let mut sink = RecordingSink::default();

        let drawn = render(blank(120, 90), &labels, &window_title("dog.jpg"), &mut sink).unwrap();

        assert_eq!(drawn, 2);
        assert_eq!(sink.shown, vec![("Labels for: dog.jpg".to_string(), 120, 90)]);
    }

    #[test]
    fn test_jpeg_file_sink() {
        let path = std::env::temp_dir().join(format!("image_labeler_{}.jpg", std::process::id()));
        let mut sink = JpegFile { path: path.clone() };

        sink.show("Labels for: x.jpg", &blank(16, 16)).unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        std::fs::remove_file(path).unwrap();
    }
}
