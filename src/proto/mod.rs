//! Wire messages for the `ucar.gcdm` protocol
//!
//! Hand-maintained `prost` definitions of the GCDM netCDF schema. Field tags
//! are part of the wire contract with the server and must not be renumbered.

#![allow(missing_docs)]

/// Fully qualified gRPC service name
pub const SERVICE_NAME: &str = "ucar.gcdm.Gcdm";

/// Error reported by the server inside a response message
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Error {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(int32, tag = "2")]
    pub code: i32,
}

/// One dimension of a section: `start`, `size` and `stride` in index space.
/// A stride of 0 is read as 1.
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Range {
    #[prost(int64, tag = "1")]
    pub start: i64,
    #[prost(int64, tag = "2")]
    pub size: i64,
    #[prost(int64, tag = "3")]
    pub stride: i64,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Section {
    #[prost(message, repeated, tag = "1")]
    pub ranges: Vec<Range>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Dimension {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint64, tag = "2")]
    pub length: u64,
    #[prost(bool, tag = "3")]
    pub is_unlimited: bool,
    #[prost(bool, tag = "4")]
    pub is_vlen: bool,
    #[prost(bool, tag = "5")]
    pub is_private: bool,
}

/// Typed values. Which repeated field is populated depends on `data_type`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Data {
    #[prost(enumeration = "DataType", tag = "1")]
    pub data_type: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub shape: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub uidata: Vec<u32>,
    #[prost(int32, repeated, tag = "4")]
    pub idata: Vec<i32>,
    #[prost(uint64, repeated, tag = "5")]
    pub uldata: Vec<u64>,
    #[prost(int64, repeated, tag = "6")]
    pub ldata: Vec<i64>,
    #[prost(float, repeated, tag = "7")]
    pub fdata: Vec<f32>,
    #[prost(double, repeated, tag = "8")]
    pub ddata: Vec<f64>,
    #[prost(string, repeated, tag = "9")]
    pub sdata: Vec<String>,
    #[prost(bytes = "vec", tag = "10")]
    pub bdata: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Attribute {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "DataType", tag = "2")]
    pub data_type: i32,
    #[prost(uint32, tag = "3")]
    pub length: u32,
    #[prost(message, optional, tag = "4")]
    pub data: Option<Data>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Variable {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "DataType", tag = "2")]
    pub data_type: i32,
    #[prost(message, repeated, tag = "3")]
    pub shapes: Vec<Dimension>,
    #[prost(message, repeated, tag = "4")]
    pub atts: Vec<Attribute>,
    #[prost(bool, tag = "5")]
    pub unsigned: bool,
    /// Values of small variables may be sent inline with the header
    #[prost(message, optional, tag = "6")]
    pub data: Option<Data>,
    #[prost(string, tag = "7")]
    pub enum_type: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct EnumType {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct EnumTypedef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub maps: Vec<EnumType>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Group {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub dims: Vec<Dimension>,
    #[prost(message, repeated, tag = "3")]
    pub vars: Vec<Variable>,
    #[prost(message, repeated, tag = "5")]
    pub atts: Vec<Attribute>,
    #[prost(message, repeated, tag = "6")]
    pub groups: Vec<Group>,
    #[prost(message, repeated, tag = "7")]
    pub enum_types: Vec<EnumTypedef>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(string, tag = "1")]
    pub location: String,
    #[prost(message, optional, tag = "2")]
    pub root: Option<Group>,
    #[prost(uint32, tag = "3")]
    pub metadata_version: u32,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct HeaderRequest {
    #[prost(string, tag = "1")]
    pub location: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<Error>,
    #[prost(message, optional, tag = "2")]
    pub header: Option<Header>,
    #[prost(uint32, tag = "3")]
    pub version: u32,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct DataRequest {
    #[prost(string, tag = "1")]
    pub location: String,
    /// Variable name, optionally followed by a section, e.g. `sst(0:1,:,:)`
    #[prost(string, tag = "2")]
    pub variable_spec: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataResponse {
    #[prost(message, optional, tag = "1")]
    pub error: Option<Error>,
    #[prost(string, tag = "2")]
    pub location: String,
    #[prost(string, tag = "3")]
    pub variable_spec: String,
    #[prost(string, tag = "4")]
    pub var_full_name: String,
    /// Section of the variable covered by this chunk
    #[prost(message, optional, tag = "5")]
    pub section: Option<Section>,
    #[prost(message, optional, tag = "6")]
    pub data: Option<Data>,
    #[prost(uint32, tag = "7")]
    pub version: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Char = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    String = 7,
    Structure = 8,
    Sequence = 9,
    Enum1 = 10,
    Enum2 = 11,
    Enum4 = 12,
    Opaque = 13,
    Ubyte = 14,
    Ushort = 15,
    Uint = 16,
    Ulong = 17,
}

impl DataType {
    /// CDL type keyword
    #[must_use]
    pub const fn cdl_name(self) -> &'static str {
        match self {
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Structure => "structure",
            Self::Sequence => "sequence",
            Self::Enum1 => "enum1",
            Self::Enum2 => "enum2",
            Self::Enum4 => "enum4",
            Self::Opaque => "opaque",
            Self::Ubyte => "ubyte",
            Self::Ushort => "ushort",
            Self::Uint => "uint",
            Self::Ulong => "uint64",
        }
    }
}
