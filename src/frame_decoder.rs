use crate::enums::Photometric;
use crate::error::DecodeError;
use crate::geometry::{Point, Size};

use dicom::core::{PrimitiveValue, Tag};
use dicom::object::{DefaultDicomObject, from_reader};
use dicom_dictionary_std::tags;
use image::RgbaImage;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const DICM_MAGIC: &[u8; 4] = b"DICM";
const PREAMBLE_LEN: usize = 128;

/// Placeholder for header fields that are absent or empty.
pub const UNKNOWN: &str = "Unknown";

/// Header fields surfaced to the metadata panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_sex: String,
    pub study_date: String,
    pub study_description: String,
    pub series_description: String,
    pub manufacturer: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            patient_id: UNKNOWN.into(),
            patient_name: UNKNOWN.into(),
            patient_sex: UNKNOWN.into(),
            study_date: UNKNOWN.into(),
            study_description: UNKNOWN.into(),
            series_description: UNKNOWN.into(),
            manufacturer: UNKNOWN.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub rows: u16,
    pub columns: u16,
    pub bits_allocated: u16,
    pub photometric: Photometric,
}

impl FrameGeometry {
    pub fn sample_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn max_sample_value(&self) -> f32 {
        if self.bits_allocated == 16 { 65535.0 } else { 255.0 }
    }
}

/// A decoded frame: the display raster plus the samples it was built from.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub geometry: FrameGeometry,
    /// Raw samples, shape (rows, columns).
    pub samples: Array2<u16>,
    /// Normalized 8-bit grayscale in RGBA with opaque alpha.
    pub raster: RgbaImage,
    pub metadata: Metadata,
}

impl DecodedFrame {
    pub fn size(&self) -> Size {
        Size::new(self.geometry.columns as f64, self.geometry.rows as f64)
    }

    /// Stored sample at an image-space position.
    pub fn sample_at(&self, position: Point) -> Option<u16> {
        if !(position.x >= 0.0 && position.y >= 0.0) {
            return None;
        }
        self.samples
            .get((position.y as usize, position.x as usize))
            .copied()
    }
}

pub struct FrameDecoder;

impl FrameDecoder {
    /// Decode a complete single-frame DICOM file.
    ///
    /// # Errors
    ///
    /// Returns error if the buffer is not DICOM, a required image element is
    /// missing, or the pixel data cannot be rasterized
    pub fn decode(bytes: &[u8]) -> Result<DecodedFrame, DecodeError> {
        let dicom_object = Self::parse_object(bytes)?;
        let geometry = Self::read_geometry(&dicom_object)?;
        let samples = Self::extract_samples(&dicom_object, &geometry)?;
        let raster = Self::normalize_to_raster(&samples, &geometry)?;
        let metadata = Self::extract_metadata(&dicom_object);

        Ok(DecodedFrame {
            geometry,
            samples,
            raster,
            metadata,
        })
    }

    fn parse_object(bytes: &[u8]) -> Result<DefaultDicomObject, DecodeError> {
        let body = if bytes.len() >= PREAMBLE_LEN + DICM_MAGIC.len()
            && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + DICM_MAGIC.len()] == DICM_MAGIC
        {
            &bytes[PREAMBLE_LEN..]
        } else if bytes.starts_with(DICM_MAGIC) {
            bytes
        } else {
            return Err(DecodeError::NotDicom);
        };
        Ok(from_reader(body)?)
    }

    fn read_u16(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<u16> {
        dicom_object.element(tag).ok()?.to_int::<u16>().ok()
    }

    fn read_string(dicom_object: &DefaultDicomObject, tag: Tag) -> Option<String> {
        let value = dicom_object.element(tag).ok()?.to_str().ok()?;
        let value = value.trim_end_matches(['\0', ' ']).trim_start();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn read_geometry(dicom_object: &DefaultDicomObject) -> Result<FrameGeometry, DecodeError> {
        let columns = Self::read_u16(dicom_object, tags::COLUMNS)
            .ok_or(DecodeError::MissingElement("Columns"))?;
        let rows =
            Self::read_u16(dicom_object, tags::ROWS).ok_or(DecodeError::MissingElement("Rows"))?;
        let bits_allocated = Self::read_u16(dicom_object, tags::BITS_ALLOCATED)
            .ok_or(DecodeError::MissingElement("BitsAllocated"))?;

        if rows == 0 || columns == 0 {
            return Err(DecodeError::InvalidDimensions { rows, columns });
        }
        if bits_allocated != 8 && bits_allocated != 16 {
            return Err(DecodeError::UnsupportedBitsAllocated(bits_allocated));
        }

        let photometric = Self::read_string(dicom_object, tags::PHOTOMETRIC_INTERPRETATION)
            .map(|p| Photometric::from_dicom(&p))
            .unwrap_or_default();

        Ok(FrameGeometry {
            rows,
            columns,
            bits_allocated,
            photometric,
        })
    }

    fn extract_samples(
        dicom_object: &DefaultDicomObject,
        geometry: &FrameGeometry,
    ) -> Result<Array2<u16>, DecodeError> {
        let pixel_data = dicom_object
            .element(tags::PIXEL_DATA)
            .map_err(|_| DecodeError::MissingElement("PixelData"))?;
        let value = pixel_data
            .value()
            .primitive()
            .ok_or(DecodeError::EncapsulatedPixelData)?;

        let count = geometry.sample_count();
        // Values past the first frame are ignored.
        let samples: Vec<u16> = match (geometry.bits_allocated, value) {
            (16, PrimitiveValue::U16(words)) => words.iter().take(count).copied().collect(),
            (16, PrimitiveValue::I16(words)) => {
                words.iter().take(count).map(|&w| w as u16).collect()
            }
            (16, PrimitiveValue::U8(bytes)) => bytes
                .chunks_exact(2)
                .take(count)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect(),
            (_, PrimitiveValue::U8(bytes)) => bytes.iter().take(count).map(|&b| b as u16).collect(),
            (_, PrimitiveValue::U16(words)) => words
                .iter()
                .flat_map(|w| w.to_le_bytes())
                .take(count)
                .map(u16::from)
                .collect(),
            (_, PrimitiveValue::Empty) => Vec::new(),
            _ => return Err(DecodeError::MissingElement("PixelData")),
        };

        let actual = samples.len();
        Array2::from_shape_vec((geometry.rows as usize, geometry.columns as usize), samples)
            .map_err(|_| DecodeError::PixelDataLength {
                expected: count,
                actual,
            })
    }

    #[inline]
    fn normalize_to_u8(value: u16, max_sample_value: f32, invert: bool) -> u8 {
        let v = ((value as f32 / max_sample_value) * 255.0).round().clamp(0.0, 255.0) as u8;
        if invert { 255 - v } else { v }
    }

    fn normalize_to_raster(
        samples: &Array2<u16>,
        geometry: &FrameGeometry,
    ) -> Result<RgbaImage, DecodeError> {
        let max_sample_value = geometry.max_sample_value();
        let invert = geometry.photometric == Photometric::Monochrome1;

        let pixel_data: Vec<u8> = samples
            .into_par_iter()
            .flat_map_iter(|&v| {
                let g = Self::normalize_to_u8(v, max_sample_value, invert);
                [g, g, g, u8::MAX]
            })
            .collect();

        let actual = pixel_data.len() / 4;
        RgbaImage::from_raw(geometry.columns as u32, geometry.rows as u32, pixel_data).ok_or(
            DecodeError::PixelDataLength {
                expected: geometry.sample_count(),
                actual,
            },
        )
    }

    fn extract_metadata(dicom_object: &DefaultDicomObject) -> Metadata {
        let field = |tag| Self::read_string(dicom_object, tag).unwrap_or_else(|| UNKNOWN.into());
        Metadata {
            patient_id: field(tags::PATIENT_ID),
            patient_name: field(tags::PATIENT_NAME),
            patient_sex: field(tags::PATIENT_SEX),
            study_date: field(tags::STUDY_DATE),
            study_description: field(tags::STUDY_DESCRIPTION),
            series_description: field(tags::SERIES_DESCRIPTION),
            manufacturer: field(tags::MANUFACTURER),
        }
    }
}
