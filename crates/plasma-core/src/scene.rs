//! Scene classification seam.
//!
//! The crate ships no model. Callers own a [`SceneClassifier`] and pass it in;
//! this module only prepares the input and interprets the logits.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlasmaError, Result};
use crate::image::Image;
use crate::sampling::resample::resize;

/// Side length of the square image a classifier receives.
pub const CLASSIFIER_INPUT_SIZE: usize = 512;

/// The scene of a real estate photograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageScene {
    Interior,
    Exterior,
    Twilight,
    Aerial,
}

impl ImageScene {
    /// Every scene, in logit order.
    pub const ALL: [ImageScene; 4] = [
        ImageScene::Interior,
        ImageScene::Exterior,
        ImageScene::Twilight,
        ImageScene::Aerial,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for ImageScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageScene::Interior => "interior",
            ImageScene::Exterior => "exterior",
            ImageScene::Twilight => "twilight",
            ImageScene::Aerial => "aerial",
        };
        f.write_str(name)
    }
}

/// A model mapping a `(1, 3, 512, 512)` RGB image in `[-1, 1]` to one logit per scene.
pub trait SceneClassifier: Send + Sync {
    fn logits(&self, image: &Image) -> Result<Vec<f32>>;
}

/// Classify a single `(1, 3, H, W)` image.
pub fn classify_scene(classifier: &dyn SceneClassifier, image: &Image) -> Result<ImageScene> {
    image.ensure_channels(3, "classify_scene")?;
    if image.batch() != 1 {
        return Err(PlasmaError::shape(
            "classify_scene",
            "a batch of one image",
            image.shape(),
        ));
    }
    let input = resize(
        image,
        (CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE),
        false,
    )?;
    let logits = classifier.logits(&input)?;
    if logits.len() != ImageScene::ALL.len() {
        return Err(PlasmaError::invalid(format!(
            "scene classifier returned {} logits, expected {}",
            logits.len(),
            ImageScene::ALL.len()
        )));
    }
    let best = logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .and_then(ImageScene::from_index)
        .ok_or_else(|| PlasmaError::invalid("scene classifier returned no logits"))?;
    debug!(?logits, scene = %best, "classified scene");
    Ok(best)
}
