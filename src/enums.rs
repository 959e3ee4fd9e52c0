use serde::{Deserialize, Serialize};

/// The tool that interprets pointer input on the viewport. Modes are mutually
/// exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    None,
    Pan,
    Brightness,
    Measurement,
    Annotation,
}

impl InteractionMode {
    /// Mouse drags pan the frame in these modes.
    pub fn pans(self) -> bool {
        matches!(self, InteractionMode::None | InteractionMode::Pan)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Sampling used when the raster is drawn through the viewport matrix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// `PhotometricInterpretation` of a monochrome frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Photometric {
    /// Minimum sample is displayed white.
    Monochrome1,
    #[default]
    Monochrome2,
}

impl Photometric {
    pub fn from_dicom(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "MONOCHROME1" => Photometric::Monochrome1,
            _ => Photometric::Monochrome2,
        }
    }
}
