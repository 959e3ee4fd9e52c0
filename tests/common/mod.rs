#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dicom_viewport::error::FetchError;
use dicom_viewport::frame_source::{FrameSource, Series};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;

pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// VRs encoded with two reserved bytes and a 32-bit length.
const LONG_VRS: [&[u8; 2]; 6] = [b"OB", b"OW", b"OF", b"SQ", b"UT", b"UN"];

/// Append one Explicit VR Little Endian element. Values are padded to even
/// length: UIDs with NUL, other strings with space, binary with zero.
pub fn push_element(buf: &mut Vec<u8>, group: u16, element: u16, vr: &[u8; 2], value: &[u8]) {
    let mut value = value.to_vec();
    if value.len() % 2 == 1 {
        let pad = match vr {
            b"UI" | b"OB" | b"OW" | b"UN" => 0,
            _ => b' ',
        };
        value.push(pad);
    }

    buf.extend_from_slice(&group.to_le_bytes());
    buf.extend_from_slice(&element.to_le_bytes());
    buf.extend_from_slice(vr);
    if LONG_VRS.contains(&vr) {
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    buf.extend_from_slice(&value);
}

/// Builder for a single-frame monochrome DICOM file.
#[derive(Debug, Clone)]
pub struct DicomFrameBuilder {
    pub rows: Option<u16>,
    pub columns: Option<u16>,
    pub bits_allocated: Option<u16>,
    pub photometric: Option<String>,
    pub pixels: Option<Vec<u16>>,
    pub strings: Vec<(u16, u16, [u8; 2], String)>,
    pub preamble: bool,
}

impl DicomFrameBuilder {
    /// A `columns` x `rows` frame filled with `value`.
    pub fn new(columns: u16, rows: u16, bits_allocated: u16, value: u16) -> Self {
        Self {
            rows: Some(rows),
            columns: Some(columns),
            bits_allocated: Some(bits_allocated),
            photometric: Some("MONOCHROME2".to_string()),
            pixels: Some(vec![value; rows as usize * columns as usize]),
            strings: Vec::new(),
            preamble: true,
        }
    }

    pub fn pixels(mut self, pixels: Vec<u16>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    pub fn photometric(mut self, photometric: &str) -> Self {
        self.photometric = Some(photometric.to_string());
        self
    }

    pub fn without_rows(mut self) -> Self {
        self.rows = None;
        self
    }

    pub fn without_columns(mut self) -> Self {
        self.columns = None;
        self
    }

    pub fn without_bits_allocated(mut self) -> Self {
        self.bits_allocated = None;
        self
    }

    pub fn without_pixels(mut self) -> Self {
        self.pixels = None;
        self
    }

    pub fn without_preamble(mut self) -> Self {
        self.preamble = false;
        self
    }

    pub fn string(mut self, group: u16, element: u16, vr: &[u8; 2], value: &str) -> Self {
        self.strings.push((group, element, *vr, value.to_string()));
        self
    }

    /// Patient, study and series strings of a typical frame.
    pub fn with_patient(self) -> Self {
        self.string(0x0008, 0x0020, b"DA", "20240131")
            .string(0x0008, 0x0070, b"LO", "ACME Imaging")
            .string(0x0008, 0x1030, b"LO", "CT HEAD")
            .string(0x0008, 0x103E, b"LO", "AXIAL 5MM")
            .string(0x0010, 0x0010, b"PN", "Doe^Jane")
            .string(0x0010, 0x0020, b"LO", "PID-0042")
            .string(0x0010, 0x0040, b"CS", "F")
    }

    fn meta_group() -> Vec<u8> {
        let mut elements = Vec::new();
        push_element(&mut elements, 0x0002, 0x0001, b"OB", &[0x00, 0x01]);
        push_element(&mut elements, 0x0002, 0x0002, b"UI", SECONDARY_CAPTURE.as_bytes());
        push_element(&mut elements, 0x0002, 0x0003, b"UI", b"1.2.826.0.1.3680043.2.1125.1");
        push_element(
            &mut elements,
            0x0002,
            0x0010,
            b"UI",
            EXPLICIT_VR_LITTLE_ENDIAN.as_bytes(),
        );
        push_element(&mut elements, 0x0002, 0x0012, b"UI", b"1.2.826.0.1.3680043.2.1125.2");

        let mut group = Vec::new();
        push_element(
            &mut group,
            0x0002,
            0x0000,
            b"UL",
            &(elements.len() as u32).to_le_bytes(),
        );
        group.extend_from_slice(&elements);
        group
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if self.preamble {
            buf.extend_from_slice(&[0u8; 128]);
        }
        buf.extend_from_slice(b"DICM");
        buf.extend_from_slice(&Self::meta_group());

        // Data set elements in ascending tag order.
        let mut strings = self.strings.clone();
        strings.sort_by_key(|(group, element, _, _)| (*group, *element));
        for (group, element, vr, value) in &strings {
            push_element(&mut buf, *group, *element, vr, value.as_bytes());
        }

        push_element(&mut buf, 0x0028, 0x0002, b"US", &1u16.to_le_bytes());
        if let Some(photometric) = &self.photometric {
            push_element(&mut buf, 0x0028, 0x0004, b"CS", photometric.as_bytes());
        }
        if let Some(rows) = self.rows {
            push_element(&mut buf, 0x0028, 0x0010, b"US", &rows.to_le_bytes());
        }
        if let Some(columns) = self.columns {
            push_element(&mut buf, 0x0028, 0x0011, b"US", &columns.to_le_bytes());
        }
        let bits = self.bits_allocated.unwrap_or(16);
        if let Some(bits_allocated) = self.bits_allocated {
            push_element(&mut buf, 0x0028, 0x0100, b"US", &bits_allocated.to_le_bytes());
            push_element(&mut buf, 0x0028, 0x0101, b"US", &bits_allocated.to_le_bytes());
            push_element(&mut buf, 0x0028, 0x0102, b"US", &(bits_allocated - 1).to_le_bytes());
        }
        push_element(&mut buf, 0x0028, 0x0103, b"US", &0u16.to_le_bytes());

        if let Some(pixels) = &self.pixels {
            if bits == 8 {
                let bytes: Vec<u8> = pixels.iter().map(|&p| p as u8).collect();
                push_element(&mut buf, 0x7FE0, 0x0010, b"OB", &bytes);
            } else {
                let bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
                push_element(&mut buf, 0x7FE0, 0x0010, b"OW", &bytes);
            }
        }
        buf
    }
}

/// A series whose frame `i` is at `"{id}/{i}.dcm"`.
pub fn series(id: &str, frames: usize) -> Series {
    Series::new(id, (0..frames).map(|i| frame_path(id, i)).collect())
}

pub fn frame_path(id: &str, index: usize) -> String {
    format!("{id}/{index}.dcm")
}

/// In-memory frames. Fetches of gated paths wait until the gate is released.
#[derive(Default)]
pub struct TestSource {
    frames: HashMap<String, Vec<u8>>,
    gates: HashMap<String, Arc<Semaphore>>,
    fetches: AtomicUsize,
}

impl TestSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.frames.insert(path.into(), bytes);
    }

    /// Frames of `series(id, n)`, frame `i` filled with the 8-bit value `values(i)`.
    pub fn insert_series(&mut self, id: &str, frames: usize, value: impl Fn(usize) -> u16) {
        for i in 0..frames {
            let bytes = DicomFrameBuilder::new(10, 10, 8, value(i))
                .with_patient()
                .build();
            self.insert(frame_path(id, i), bytes);
        }
    }

    pub fn gate(&mut self, path: impl Into<String>) {
        self.gates.insert(path.into(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, path: &str) {
        if let Some(gate) = self.gates.get(path) {
            gate.add_permits(1);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl FrameSource for TestSource {
    fn fetch(&self, path: &str) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bytes = self.frames.get(path).cloned();
        let gate = self.gates.get(path).cloned();
        let path = path.to_string();
        async move {
            if let Some(gate) = gate {
                gate.acquire()
                    .await
                    .map_err(|e| FetchError::Other(e.to_string()))?
                    .forget();
            }
            bytes.ok_or(FetchError::NotFound(path))
        }
        .boxed()
    }
}
