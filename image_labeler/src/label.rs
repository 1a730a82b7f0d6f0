/// Location of one object in S3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub bucket: String,
    pub key: String,
}

impl ImageRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Base file name of the key, e.g. `my_test_image.jpg` for
    /// `images/my_test_image.jpg`.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Bounding box normalized to the image dimensions, all values in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
    pub instances: Vec<BoundingBox>,
    pub parents: Vec<String>,
}

impl Label {
    pub fn rounded_confidence(&self) -> String {
        format_confidence(self.confidence)
    }

    /// A label describing the whole scene rather than a located object.
    pub fn is_scene_level(&self) -> bool {
        self.instances.is_empty() && self.parents.is_empty()
    }
}

pub fn round_confidence(confidence: f32) -> f32 {
    (confidence * 100.0).round() / 100.0
}

/// Rounded confidence as printed to users: `98.77`, `99.5`, `90.0`.
pub fn format_confidence(confidence: f32) -> String {
    let rounded = round_confidence(confidence);
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}
