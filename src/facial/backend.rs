use image::DynamicImage;

use super::classifier::FacialError;

/// Raw per-face output of a face backend
#[derive(Debug, Clone, PartialEq)]
pub struct FaceScores {
    /// Label → score in percent (0-100). May omit labels.
    pub emotions: Vec<(String, f32)>,
    /// Dominant label as reported by the backend
    pub dominant: Option<String>,
}

impl FaceScores {
    pub fn new<I, S>(emotions: I, dominant: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            emotions: emotions.into_iter().map(|(l, s)| (l.into(), s)).collect(),
            dominant: dominant.map(str::to_string),
        }
    }
}

/// Face detection + emotion model.
///
/// Returns `Ok(None)` when no face is found in the image.
pub trait FaceBackend: Send + Sync {
    fn name(&self) -> &str;

    fn analyze(&self, image: &DynamicImage) -> Result<Option<FaceScores>, FacialError>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// Backend that reports every decodable frame as a fully neutral face
#[derive(Debug, Default, Clone, Copy)]
pub struct StubFaceBackend;

impl FaceBackend for StubFaceBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn analyze(&self, _image: &DynamicImage) -> Result<Option<FaceScores>, FacialError> {
        Ok(Some(FaceScores::new([("neutral", 100.0)], Some("neutral"))))
    }
}
