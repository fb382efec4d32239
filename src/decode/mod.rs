//! Decoding of GCDM responses into an in-memory netCDF file
//!
//! The fetch pipeline only knows the [`Decoder`] trait; [`NetcdfDecoder`] is
//! the implementation used by the CLI.

use crate::error::{GcdmError, Result};
use crate::proto::{DataResponse, DataType, HeaderResponse};
use serde::Serialize;

pub mod array;
mod cdl;
pub mod model;

pub use array::{Array, Chunk, SectionRange, Values};
pub use model::{Attribute, Dimension, EnumTypedef, FileHeader, Group, Variable};

/// Turns a header response and the data chunks of one variable into a file
pub trait Decoder {
    /// Decoded representation
    type Output;

    /// Decode `header` and `data`; `data` holds the chunks in arrival order
    ///
    /// # Errors
    ///
    /// Returns an error if the responses cannot be turned into `Output`.
    fn decode(&self, header: HeaderResponse, data: Vec<DataResponse>) -> Result<Self::Output>;
}

/// The requested variable together with its values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedVariable {
    /// Full name, including the group path
    pub full_name: String,
    /// Element type, after applying the unsigned flag
    #[serde(serialize_with = "model::serialize_data_type")]
    pub data_type: DataType,
    /// Dimension names in declaration order
    pub dimensions: Vec<String>,
    /// Variable attributes
    pub attributes: Vec<Attribute>,
    /// Section of the variable the values cover
    pub section: Vec<SectionRange>,
    /// Shape of `values`
    pub shape: Vec<usize>,
    /// Values in row-major order
    pub values: Values,
}

/// A file header plus the data of one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFile {
    /// Header of the file
    pub header: FileHeader,
    /// The requested variable
    pub variable: DecodedVariable,
}

/// Decoder for the GCDM netCDF schema
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfDecoder;

impl NetcdfDecoder {
    /// Create a decoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for NetcdfDecoder {
    type Output = DecodedFile;

    fn decode(&self, header: HeaderResponse, data: Vec<DataResponse>) -> Result<DecodedFile> {
        let file_header = FileHeader::from_response(&header)?;

        let Some(first) = data.first() else {
            return Err(GcdmError::NoData {
                location: file_header.location,
                variable_spec: String::new(),
            });
        };
        let full_name = variable_name(first).to_string();
        let variable_spec = first.variable_spec.clone();

        let variable = file_header
            .root
            .find_variable(&full_name)
            .ok_or_else(|| GcdmError::UnknownVariable {
                name: full_name.clone(),
            })?
            .clone();

        let mut chunks = Vec::with_capacity(data.len());
        for (index, response) in data.iter().enumerate() {
            chunks.push(decode_chunk(index, response, &variable)?);
        }
        tracing::debug!(
            variable = %full_name,
            chunks = chunks.len(),
            "assembling variable data"
        );
        let array = array::assemble(chunks)?;

        if array.section.len() != variable.dimensions.len() && !variable.dimensions.is_empty() {
            return Err(GcdmError::Decode(format!(
                "data for '{variable_spec}' has rank {} but '{full_name}' has {} dimensions",
                array.section.len(),
                variable.dimensions.len()
            )));
        }

        let data_type = if variable.unsigned {
            array::unsigned_of(variable.data_type)
        } else {
            variable.data_type
        };

        Ok(DecodedFile {
            variable: DecodedVariable {
                full_name,
                data_type,
                dimensions: variable.dimensions.iter().map(|d| d.name.clone()).collect(),
                attributes: variable.attributes,
                section: array.section,
                shape: array.shape,
                values: array.values,
            },
            header: file_header,
        })
    }
}

/// Name of the variable a data response belongs to: the server's full name,
/// else the name part of the request's variable spec
fn variable_name(response: &DataResponse) -> &str {
    if !response.var_full_name.is_empty() {
        return &response.var_full_name;
    }
    let spec = response.variable_spec.as_str();
    spec.split_once('(').map_or(spec, |(name, _)| name).trim()
}

fn decode_chunk(index: usize, response: &DataResponse, variable: &Variable) -> Result<Chunk> {
    if let Some(error) = &response.error {
        return Err(GcdmError::Remote {
            location: response.location.clone(),
            code: error.code,
            message: error.message.clone(),
        });
    }
    let data = response
        .data
        .as_ref()
        .ok_or_else(|| GcdmError::Decode(format!("chunk {index} carries no data")))?;

    let section = response
        .section
        .as_ref()
        .filter(|s| !s.ranges.is_empty())
        .map(|s| s.ranges.iter().map(SectionRange::from_wire).collect::<Result<Vec<_>>>())
        .transpose()?;

    let values = Values::from_wire(data, variable.data_type, variable.unsigned)?;
    let shape: Vec<usize> = if !data.shape.is_empty() {
        data.shape.iter().map(|&d| d as usize).collect()
    } else if let Some(ranges) = &section {
        ranges.iter().map(|r| r.size).collect()
    } else if variable.dimensions.is_empty() {
        Vec::new()
    } else {
        // no shape at all: a flat run along the outermost dimension
        vec![values.len()]
    };

    Chunk::new(section, shape, values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::proto;

    fn header() -> HeaderResponse {
        HeaderResponse {
            error: None,
            header: Some(proto::Header {
                location: "./test/data/test.nc".to_string(),
                root: Some(proto::Group {
                    dims: vec![
                        proto::Dimension {
                            name: "lat".to_string(),
                            length: 2,
                            ..Default::default()
                        },
                        proto::Dimension {
                            name: "lon".to_string(),
                            length: 2,
                            ..Default::default()
                        },
                    ],
                    vars: vec![proto::Variable {
                        name: "analysed_sst".to_string(),
                        data_type: DataType::Short as i32,
                        shapes: vec![
                            proto::Dimension {
                                name: "lat".to_string(),
                                length: 2,
                                ..Default::default()
                            },
                            proto::Dimension {
                                name: "lon".to_string(),
                                length: 2,
                                ..Default::default()
                            },
                        ],
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                metadata_version: 1,
            }),
            version: 1,
        }
    }

    fn chunk(lat: i64, values: Vec<i32>) -> DataResponse {
        DataResponse {
            location: "./test/data/test.nc".to_string(),
            variable_spec: "analysed_sst".to_string(),
            var_full_name: "analysed_sst".to_string(),
            section: Some(proto::Section {
                ranges: vec![
                    proto::Range {
                        start: lat,
                        size: 1,
                        stride: 1,
                    },
                    proto::Range {
                        start: 0,
                        size: 2,
                        stride: 1,
                    },
                ],
            }),
            data: Some(proto::Data {
                data_type: DataType::Short as i32,
                shape: vec![1, 2],
                idata: values,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_multi_chunk_variable() {
        let decoded = NetcdfDecoder::new()
            .decode(header(), vec![chunk(0, vec![1, 2]), chunk(1, vec![3, 4])])
            .unwrap();
        assert_eq!(decoded.header.location, "./test/data/test.nc");
        assert_eq!(decoded.variable.full_name, "analysed_sst");
        assert_eq!(decoded.variable.dimensions, vec!["lat", "lon"]);
        assert_eq!(decoded.variable.shape, vec![2, 2]);
        assert_eq!(decoded.variable.values, Values::Short(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_unknown_variable() {
        let mut data = chunk(0, vec![1, 2]);
        data.var_full_name = "no_such_var".to_string();
        let err = NetcdfDecoder::new().decode(header(), vec![data]).unwrap_err();
        assert!(matches!(err, GcdmError::UnknownVariable { name } if name == "no_such_var"));
    }

    #[test]
    fn test_variable_name_from_spec_with_section() {
        let response = DataResponse {
            variable_spec: "analysed_sst(0:0, 0:1)".to_string(),
            ..Default::default()
        };
        assert_eq!(variable_name(&response), "analysed_sst");
    }

    #[test]
    fn test_value_count_mismatch() {
        let err = NetcdfDecoder::new()
            .decode(header(), vec![chunk(0, vec![1, 2, 3])])
            .unwrap_err();
        assert!(matches!(err, GcdmError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_chunk_error_is_remote_error() {
        let mut data = chunk(0, vec![1, 2]);
        data.error = Some(proto::Error {
            message: "variable is too large".to_string(),
            code: 13,
        });
        assert!(matches!(
            NetcdfDecoder::new().decode(header(), vec![data]),
            Err(GcdmError::Remote { code: 13, .. })
        ));
    }

    #[test]
    fn test_no_chunks() {
        assert!(matches!(
            NetcdfDecoder::new().decode(header(), Vec::new()),
            Err(GcdmError::NoData { .. })
        ));
    }
}
