//! Typed value arrays and multi-chunk assembly
//!
//! A data stream may split one variable into several chunks, each tagged with
//! the section of the variable it covers. [`assemble`] places every chunk into
//! a single row-major array spanning the bounding section of all chunks.

use crate::error::{GcdmError, Result};
use crate::proto::{self, DataType};
use serde::Serialize;

/// Values of one array, stored with their element type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Values {
    /// Characters as raw bytes
    Char(Vec<u8>),
    /// Signed 8-bit
    Byte(Vec<i8>),
    /// Unsigned 8-bit, also `enum1`
    Ubyte(Vec<u8>),
    /// Signed 16-bit
    Short(Vec<i16>),
    /// Unsigned 16-bit, also `enum2`
    Ushort(Vec<u16>),
    /// Signed 32-bit
    Int(Vec<i32>),
    /// Unsigned 32-bit, also `enum4`
    Uint(Vec<u32>),
    /// Signed 64-bit
    Long(Vec<i64>),
    /// Unsigned 64-bit
    Ulong(Vec<u64>),
    /// 32-bit float
    Float(Vec<f32>),
    /// 64-bit float
    Double(Vec<f64>),
    /// Variable-length strings
    String(Vec<String>),
}

/// Apply `$body` to the vector inside any variant of [`Values`]
macro_rules! with_vec {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            Values::Char($v) | Values::Ubyte($v) => $body,
            Values::Byte($v) => $body,
            Values::Short($v) => $body,
            Values::Ushort($v) => $body,
            Values::Int($v) => $body,
            Values::Uint($v) => $body,
            Values::Long($v) => $body,
            Values::Ulong($v) => $body,
            Values::Float($v) => $body,
            Values::Double($v) => $body,
            Values::String($v) => $body,
        }
    };
}

/// Apply `$body` to the vectors of two [`Values`] of the same variant
macro_rules! with_pair {
    ($dst:expr, $src:expr, ($d:ident, $s:ident) => $body:expr, $mismatch:expr) => {
        match ($dst, $src) {
            (Values::Char($d), Values::Char($s)) | (Values::Ubyte($d), Values::Ubyte($s)) => $body,
            (Values::Byte($d), Values::Byte($s)) => $body,
            (Values::Short($d), Values::Short($s)) => $body,
            (Values::Ushort($d), Values::Ushort($s)) => $body,
            (Values::Int($d), Values::Int($s)) => $body,
            (Values::Uint($d), Values::Uint($s)) => $body,
            (Values::Long($d), Values::Long($s)) => $body,
            (Values::Ulong($d), Values::Ulong($s)) => $body,
            (Values::Float($d), Values::Float($s)) => $body,
            (Values::Double($d), Values::Double($s)) => $body,
            (Values::String($d), Values::String($s)) => $body,
            _ => $mismatch,
        }
    };
}

impl Values {
    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    /// Whether the array holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Char(_) => "char",
            Self::Byte(_) => "byte",
            Self::Ubyte(_) => "ubyte",
            Self::Short(_) => "short",
            Self::Ushort(_) => "ushort",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Long(_) => "int64",
            Self::Ulong(_) => "uint64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
        }
    }

    /// A zeroed array of the same element type
    #[must_use]
    pub fn zeroed_like(&self, len: usize) -> Self {
        match self {
            Self::Char(_) => Self::Char(vec![0; len]),
            Self::Byte(_) => Self::Byte(vec![0; len]),
            Self::Ubyte(_) => Self::Ubyte(vec![0; len]),
            Self::Short(_) => Self::Short(vec![0; len]),
            Self::Ushort(_) => Self::Ushort(vec![0; len]),
            Self::Int(_) => Self::Int(vec![0; len]),
            Self::Uint(_) => Self::Uint(vec![0; len]),
            Self::Long(_) => Self::Long(vec![0; len]),
            Self::Ulong(_) => Self::Ulong(vec![0; len]),
            Self::Float(_) => Self::Float(vec![0.0; len]),
            Self::Double(_) => Self::Double(vec![0.0; len]),
            Self::String(_) => Self::String(vec![String::new(); len]),
        }
    }

    /// Copy `src[i]` to `self[indices[i]]` for every element of `src`
    fn place(&mut self, src: &Self, indices: &[usize]) -> Result<()> {
        let mismatch = type_mismatch(self, src);
        with_pair!(self, src, (d, s) => {
            for (value, &index) in s.iter().zip(indices) {
                d[index].clone_from(value);
            }
            Ok(())
        }, Err(mismatch))
    }

    /// Append the elements of `other`
    fn append(&mut self, other: Self) -> Result<()> {
        let mismatch = type_mismatch(self, &other);
        with_pair!(self, other, (d, s) => {
            d.extend(s);
            Ok(())
        }, Err(mismatch))
    }

    /// Convert wire values into typed values.
    ///
    /// `unsigned` reinterprets the bits of signed integer types as their
    /// unsigned counterparts. Values of declared unsigned types that arrive in
    /// a signed field must be in range. The caller checks the element count
    /// against the shape.
    ///
    /// # Errors
    ///
    /// Returns `Decode` for out-of-range values and `UnsupportedType` for
    /// structure, sequence and opaque data.
    pub fn from_wire(data: &proto::Data, declared: DataType, unsigned: bool) -> Result<Self> {
        let values = match (declared, unsigned) {
            (DataType::Byte, true) => Self::Ubyte(data.bdata.clone()),
            (DataType::Short, true) => Self::Ushort(
                narrow::<i32, i16>(&data.idata, "short")?
                    .into_iter()
                    .map(|v| u16::from_ne_bytes(v.to_ne_bytes()))
                    .collect(),
            ),
            (DataType::Int, true) => Self::Uint(
                data.idata
                    .iter()
                    .map(|v| u32::from_ne_bytes(v.to_ne_bytes()))
                    .collect(),
            ),
            (DataType::Long, true) => Self::Ulong(
                data.ldata
                    .iter()
                    .map(|v| u64::from_ne_bytes(v.to_ne_bytes()))
                    .collect(),
            ),
            _ => Self::from_wire_declared(data, declared)?,
        };
        Ok(values)
    }

    fn from_wire_declared(data: &proto::Data, declared: DataType) -> Result<Self> {
        let values = match declared {
            DataType::Char => Self::Char(data.bdata.clone()),
            DataType::Byte => Self::Byte(
                data.bdata
                    .iter()
                    .map(|&b| i8::from_ne_bytes([b]))
                    .collect(),
            ),
            DataType::Ubyte | DataType::Enum1 => {
                if data.bdata.is_empty() {
                    Self::Ubyte(narrow(&data.uidata, "ubyte")?)
                } else {
                    Self::Ubyte(data.bdata.clone())
                }
            }
            DataType::Short => Self::Short(narrow(&data.idata, "short")?),
            DataType::Int => Self::Int(data.idata.clone()),
            DataType::Ushort | DataType::Enum2 => {
                if data.uidata.is_empty() {
                    Self::Ushort(narrow(&data.idata, "ushort")?)
                } else {
                    Self::Ushort(narrow(&data.uidata, "ushort")?)
                }
            }
            DataType::Uint | DataType::Enum4 => {
                if data.uidata.is_empty() {
                    Self::Uint(narrow(&data.idata, "uint")?)
                } else {
                    Self::Uint(data.uidata.clone())
                }
            }
            DataType::Long => Self::Long(data.ldata.clone()),
            DataType::Ulong => {
                if data.uldata.is_empty() {
                    Self::Ulong(narrow(&data.ldata, "uint64")?)
                } else {
                    Self::Ulong(data.uldata.clone())
                }
            }
            DataType::Float => Self::Float(data.fdata.clone()),
            DataType::Double => Self::Double(data.ddata.clone()),
            DataType::String => Self::String(data.sdata.clone()),
            DataType::Structure | DataType::Sequence | DataType::Opaque => {
                return Err(GcdmError::UnsupportedType(declared.cdl_name().to_string()));
            }
        };
        Ok(values)
    }
}

fn type_mismatch(dst: &Values, src: &Values) -> GcdmError {
    GcdmError::Decode(format!(
        "chunk element type {} does not match {}",
        src.kind(),
        dst.kind()
    ))
}

/// Unsigned counterpart of a signed integer type
pub(crate) const fn unsigned_of(declared: DataType) -> DataType {
    match declared {
        DataType::Byte => DataType::Ubyte,
        DataType::Short => DataType::Ushort,
        DataType::Int => DataType::Uint,
        DataType::Long => DataType::Ulong,
        other => other,
    }
}

fn narrow<S, T>(values: &[S], kind: &str) -> Result<Vec<T>>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    values
        .iter()
        .map(|&v| {
            T::try_from(v)
                .map_err(|_| GcdmError::Decode(format!("value {v} out of range for {kind}")))
        })
        .collect()
}

/// One dimension of a section in index space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionRange {
    /// First index
    pub start: u64,
    /// Number of elements
    pub size: usize,
    /// Step between elements, at least 1
    pub stride: u64,
}

impl SectionRange {
    /// Convert a wire range, reading a zero stride as 1
    ///
    /// # Errors
    ///
    /// Returns `Decode` for a negative start, size or stride.
    pub fn from_wire(range: &proto::Range) -> Result<Self> {
        let start = u64::try_from(range.start)
            .map_err(|_| GcdmError::Decode(format!("negative section start {}", range.start)))?;
        let size = usize::try_from(range.size)
            .map_err(|_| GcdmError::Decode(format!("negative section size {}", range.size)))?;
        let stride = match range.stride {
            0 => 1,
            s => u64::try_from(s)
                .map_err(|_| GcdmError::Decode(format!("negative section stride {s}")))?,
        };
        Ok(Self { start, size, stride })
    }

    /// Index of the last element covered
    fn last(&self) -> Result<u64> {
        (self.size as u64)
            .saturating_sub(1)
            .checked_mul(self.stride)
            .and_then(|span| span.checked_add(self.start))
            .ok_or_else(|| GcdmError::Decode(format!("section {self:?} exceeds the index space")))
    }
}

/// One decoded chunk of a data stream
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Section covered, if the server sent one
    pub section: Option<Vec<SectionRange>>,
    /// Shape of `values`
    pub shape: Vec<usize>,
    /// Values in row-major order
    pub values: Values,
}

impl Chunk {
    /// Build a chunk, checking the element count against the shape
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the count differs and `Decode` if the
    /// section sizes disagree with the shape or the shape is too large.
    pub fn new(section: Option<Vec<SectionRange>>, shape: Vec<usize>, values: Values) -> Result<Self> {
        let expected = element_count(&shape)?;
        if values.len() != expected {
            return Err(GcdmError::ShapeMismatch {
                what: format!("chunk of shape {shape:?}"),
                expected,
                actual: values.len(),
            });
        }
        if let Some(ranges) = &section {
            let sizes: Vec<usize> = ranges.iter().map(|r| r.size).collect();
            if sizes != shape {
                return Err(GcdmError::Decode(format!(
                    "chunk section sizes {sizes:?} disagree with data shape {shape:?}"
                )));
            }
        }
        Ok(Self {
            section,
            shape,
            values,
        })
    }
}

/// An assembled array with the section of the variable it covers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Array {
    /// Bounding section of all chunks
    pub section: Vec<SectionRange>,
    /// Shape of `values`
    pub shape: Vec<usize>,
    /// Values in row-major order
    pub values: Values,
}

/// Product of the dimension lengths; a scalar holds one element
///
/// # Errors
///
/// Returns `Decode` if the product does not fit in `usize`.
pub fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| GcdmError::Decode(format!("shape {shape:?} is too large")))
}

/// Assemble chunks, in arrival order, into one array.
///
/// Chunks carrying sections are placed by section. Chunks without sections
/// are concatenated along the outermost dimension. Mixing the two, chunks
/// that overlap, and gaps in the bounding section are errors.
///
/// # Errors
///
/// Returns `IncompleteData` when the chunks do not tile one array and
/// `Decode` for mismatched element types or oversized sections.
pub fn assemble(mut chunks: Vec<Chunk>) -> Result<Array> {
    if chunks.len() == 1 {
        let chunk = chunks.remove(0);
        let section = chunk.section.unwrap_or_else(|| full_section(&chunk.shape));
        return Ok(Array {
            section,
            shape: chunk.shape,
            values: chunk.values,
        });
    }
    if chunks.is_empty() {
        return Err(GcdmError::IncompleteData("no chunks to assemble".to_string()));
    }

    let sectioned = chunks.iter().filter(|c| c.section.is_some()).count();
    if sectioned == chunks.len() {
        assemble_by_section(&chunks)
    } else if sectioned == 0 {
        concatenate(chunks)
    } else {
        Err(GcdmError::IncompleteData(format!(
            "{sectioned} of {} chunks carry a section",
            chunks.len()
        )))
    }
}

fn full_section(shape: &[usize]) -> Vec<SectionRange> {
    shape
        .iter()
        .map(|&size| SectionRange {
            start: 0,
            size,
            stride: 1,
        })
        .collect()
}

fn assemble_by_section(chunks: &[Chunk]) -> Result<Array> {
    let sections: Vec<&[SectionRange]> = chunks
        .iter()
        .filter_map(|c| c.section.as_deref())
        .collect();
    let rank = sections[0].len();
    if sections.iter().any(|s| s.len() != rank) {
        return Err(GcdmError::IncompleteData(
            "chunk sections have different ranks".to_string(),
        ));
    }

    let mut bounds = Vec::with_capacity(rank);
    for dim in 0..rank {
        let stride = sections[0][dim].stride;
        let ranges = sections.iter().map(|s| s[dim]).filter(|r| r.size > 0);
        let mut lo = u64::MAX;
        let mut hi = 0;
        for range in ranges {
            if range.stride != stride {
                return Err(GcdmError::IncompleteData(format!(
                    "dimension {dim} mixes strides {stride} and {}",
                    range.stride
                )));
            }
            lo = lo.min(range.start);
            hi = hi.max(range.last()?);
        }
        if lo == u64::MAX {
            return Err(GcdmError::IncompleteData(format!("dimension {dim} is empty")));
        }
        let size = ((hi - lo) / stride)
            .checked_add(1)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| GcdmError::Decode(format!("dimension {dim} too large")))?;
        bounds.push(SectionRange {
            start: lo,
            size,
            stride,
        });
    }

    let shape: Vec<usize> = bounds.iter().map(|r| r.size).collect();
    let total = element_count(&shape)?;
    let received = chunks
        .iter()
        .try_fold(0usize, |acc, c| acc.checked_add(c.values.len()))
        .ok_or_else(|| GcdmError::Decode("chunk sizes overflow".to_string()))?;
    if received != total {
        return Err(GcdmError::IncompleteData(format!(
            "chunks hold {received} elements but their bounding section {shape:?} needs {total}"
        )));
    }
    let mut values = chunks[0].values.zeroed_like(total);
    let mut covered = vec![false; total];

    for (chunk, section) in chunks.iter().zip(&sections) {
        let mut offsets = Vec::with_capacity(rank);
        for (range, bound) in section.iter().zip(&bounds) {
            let delta = range.start - bound.start;
            if delta % bound.stride != 0 {
                return Err(GcdmError::IncompleteData(format!(
                    "chunk start {} is off the stride grid of {}",
                    range.start, bound.stride
                )));
            }
            offsets.push(usize::try_from(delta / bound.stride).map_err(|_| {
                GcdmError::Decode("section offset too large".to_string())
            })?);
        }

        let indices = destination_indices(&chunk.shape, chunk.values.len(), &offsets, &shape);
        for &index in &indices {
            if covered[index] {
                return Err(GcdmError::IncompleteData(
                    "overlapping chunks".to_string(),
                ));
            }
            covered[index] = true;
        }
        values.place(&chunk.values, &indices)?;
    }

    let missing = covered.iter().filter(|c| !**c).count();
    if missing > 0 {
        return Err(GcdmError::IncompleteData(format!(
            "{missing} of {total} elements not covered by any chunk"
        )));
    }

    Ok(Array {
        section: bounds,
        shape,
        values,
    })
}

fn concatenate(chunks: Vec<Chunk>) -> Result<Array> {
    let mut iter = chunks.into_iter();
    let Some(first) = iter.next() else {
        return Err(GcdmError::IncompleteData("no chunks to assemble".to_string()));
    };
    if first.shape.is_empty() {
        return Err(GcdmError::IncompleteData(
            "cannot concatenate scalar chunks".to_string(),
        ));
    }

    let mut shape = first.shape;
    let mut values = first.values;
    for chunk in iter {
        if chunk.shape.len() != shape.len() || chunk.shape[1..] != shape[1..] {
            return Err(GcdmError::IncompleteData(format!(
                "chunk shape {:?} cannot follow {shape:?}",
                chunk.shape
            )));
        }
        shape[0] += chunk.shape[0];
        values.append(chunk.values)?;
    }

    Ok(Array {
        section: full_section(&shape),
        shape,
        values,
    })
}

/// Row-major destination index of each of the `count` elements of a chunk of
/// shape `chunk_shape` placed at `offsets` inside an array of shape `dst_shape`
fn destination_indices(
    chunk_shape: &[usize],
    count: usize,
    offsets: &[usize],
    dst_shape: &[usize],
) -> Vec<usize> {
    let rank = dst_shape.len();
    let mut strides = vec![1usize; rank];
    for dim in (0..rank.saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * dst_shape[dim + 1];
    }

    let mut indices = Vec::with_capacity(count);
    let mut cursor = vec![0usize; rank];
    for _ in 0..count {
        indices.push(
            cursor
                .iter()
                .zip(offsets)
                .zip(&strides)
                .map(|((&i, &off), &stride)| (i + off) * stride)
                .sum(),
        );
        // odometer increment, innermost dimension fastest
        for dim in (0..rank).rev() {
            cursor[dim] += 1;
            if cursor[dim] < chunk_shape[dim] {
                break;
            }
            cursor[dim] = 0;
        }
    }
    indices
}
