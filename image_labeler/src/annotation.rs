//! Pixel-space layout of the overlay, computed without touching the bitmap.

use crate::label::{BoundingBox, Label};

/// Distance the caption sits above the top edge of its box.
const CAPTION_LIFT: f32 = 10.0;
/// Offset below the top edge used when the lifted caption would leave the image.
const CAPTION_DROP: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn from_normalized(bbox: &BoundingBox, image_width: u32, image_height: u32) -> Self {
        let (w, h) = (image_width as f32, image_height as f32);
        Self {
            left: bbox.left * w,
            top: bbox.top * h,
            width: bbox.width * w,
            height: bbox.height * h,
        }
    }

    pub fn to_normalized(&self, image_width: u32, image_height: u32) -> BoundingBox {
        let (w, h) = (image_width as f32, image_height as f32);
        BoundingBox {
            left: self.left / w,
            top: self.top / h,
            width: self.width / w,
            height: self.height / h,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub rect: PixelRect,
    pub caption: Caption,
}

pub fn caption_text(label: &Label) -> String {
    format!("{} ({}%)", label.name, label.rounded_confidence())
}

pub fn caption_y(top: f32) -> f32 {
    if top - CAPTION_LIFT > 0.0 {
        top - CAPTION_LIFT
    } else {
        top + CAPTION_DROP
    }
}

/// One annotation per bounding-box instance, in label order. Labels without
/// instances are skipped.
pub fn layout(labels: &[Label], image_width: u32, image_height: u32) -> Vec<Annotation> {
    labels
        .iter()
        .flat_map(|label| {
            let text = caption_text(label);
            label.instances.iter().map(move |bbox| {
                let rect = PixelRect::from_normalized(bbox, image_width, image_height);
                Annotation {
                    caption: Caption {
                        text: text.clone(),
                        x: rect.left,
                        y: caption_y(rect.top),
                    },
                    rect,
                }
            })
        })
        .collect()
}
