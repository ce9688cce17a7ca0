//! Binary model format.
//!
//! Layout (little endian):
//!
//! ```text
//! "GSTM"  u16 version  u8 normalization
//! u32 class_count  { u32 len, utf8 bytes } * class_count
//! u32 layer_count  { u32 rows, u32 cols, f32 * rows*cols, f32 * cols } * layer_count
//! ```
//!
//! Weights are row-major `inputs × outputs`. Decoding rejects anything that
//! would not produce a usable classifier.

use gestura_core::{GestureClassSet, NormalizationMode, FEATURE_DIM};
use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::classifier::{Classifier, Dense};

const MAGIC: &[u8; 4] = b"GSTM";
pub const FORMAT_VERSION: u16 = 1;

const MAX_CLASSES: usize = 1024;
const MAX_LAYERS: usize = 16;
const MAX_UNITS: usize = 4096;

#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("truncated at byte {0}")]
    Truncated(usize),
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown normalization code {0}")]
    UnknownMode(u8),
    #[error("class name is not valid UTF-8")]
    InvalidUtf8,
    #[error("class list is not sorted and unique")]
    UnsortedClasses,
    #[error("bad shape: {0}")]
    Shape(String),
    #[error("non-finite parameter in layer {0}")]
    NonFinite(usize),
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
}

/// Everything a model blob carries.
#[derive(Debug, Clone)]
pub struct DecodedModel {
    pub classifier: Classifier,
    pub classes: GestureClassSet,
    pub mode: NormalizationMode,
}

pub fn encode(classifier: &Classifier, classes: &GestureClassSet, mode: NormalizationMode) -> Vec<u8> {
    let params: usize = classifier
        .layers()
        .iter()
        .map(|l| l.weights.len() + l.bias.len())
        .sum();
    let mut out = Vec::with_capacity(16 + params * 4 + classes.len() * 16);

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(mode.code());

    out.extend_from_slice(&(classes.len() as u32).to_le_bytes());
    for label in classes.iter() {
        out.extend_from_slice(&(label.len() as u32).to_le_bytes());
        out.extend_from_slice(label.as_bytes());
    }

    out.extend_from_slice(&(classifier.layers().len() as u32).to_le_bytes());
    for layer in classifier.layers() {
        out.extend_from_slice(&(layer.inputs() as u32).to_le_bytes());
        out.extend_from_slice(&(layer.outputs() as u32).to_le_bytes());
        for v in layer.weights.iter() {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for v in layer.bias.iter() {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

pub fn decode(bytes: &[u8]) -> Result<DecodedModel, CodecError> {
    let mut r = Reader { bytes, pos: 0 };

    if r.take(4)? != MAGIC {
        return Err(CodecError::BadMagic);
    }
    let version = r.u16()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let code = r.u8()?;
    let mode = NormalizationMode::from_code(code).ok_or(CodecError::UnknownMode(code))?;

    let class_count = r.count(MAX_CLASSES, "class count")?;
    if class_count == 0 {
        return Err(CodecError::Shape("no classes".into()));
    }
    let mut labels = Vec::with_capacity(class_count);
    for _ in 0..class_count {
        let len = r.u32()? as usize;
        let raw = r.take(len)?;
        let label = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
        labels.push(label.to_string());
    }
    let classes = GestureClassSet::from_labels(labels.iter().map(String::as_str));
    if classes.labels() != labels.as_slice() {
        return Err(CodecError::UnsortedClasses);
    }

    let layer_count = r.count(MAX_LAYERS, "layer count")?;
    if layer_count == 0 {
        return Err(CodecError::Shape("no layers".into()));
    }
    let mut layers = Vec::with_capacity(layer_count);
    for index in 0..layer_count {
        let rows = r.count(MAX_UNITS, "rows")?;
        let cols = r.count(MAX_UNITS, "cols")?;
        let weights = r.f32s(rows * cols)?;
        let bias = r.f32s(cols)?;
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(CodecError::NonFinite(index));
        }
        let weights = Array2::from_shape_vec((rows, cols), weights)
            .map_err(|e| CodecError::Shape(e.to_string()))?;
        layers.push(Dense {
            weights,
            bias: Array1::from(bias),
        });
    }

    if r.pos != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - r.pos));
    }

    let classifier =
        Classifier::from_layers(layers).map_err(|e| CodecError::Shape(e.to_string()))?;
    if classifier.input_dim() != FEATURE_DIM {
        return Err(CodecError::Shape(format!(
            "input dimension {} (expected {})",
            classifier.input_dim(),
            FEATURE_DIM
        )));
    }
    if classifier.output_dim() != classes.len() {
        return Err(CodecError::Shape(format!(
            "{} outputs for {} classes",
            classifier.output_dim(),
            classes.len()
        )));
    }

    Ok(DecodedModel {
        classifier,
        classes,
        mode,
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(CodecError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn count(&mut self, max: usize, what: &str) -> Result<usize, CodecError> {
        let n = self.u32()? as usize;
        if n > max {
            return Err(CodecError::Shape(format!("{} {} exceeds {}", what, n, max)));
        }
        Ok(n)
    }

    fn f32s(&mut self, n: usize) -> Result<Vec<f32>, CodecError> {
        let bytes = self.take(n.checked_mul(4).ok_or(CodecError::Truncated(self.pos))?)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
