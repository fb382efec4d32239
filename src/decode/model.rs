//! Owned netCDF metadata model built from the wire header

use super::array::Values;
use crate::error::{GcdmError, Result};
use crate::proto::{self, DataType};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub(crate) fn serialize_data_type<S: Serializer>(
    data_type: &DataType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(data_type.cdl_name())
}

/// Resolve a wire enumeration value, rejecting unknown codes
///
/// # Errors
///
/// Returns `UnsupportedType` for a code outside the enumeration.
pub fn data_type_of(raw: i32) -> Result<DataType> {
    DataType::try_from(raw).map_err(|_| GcdmError::UnsupportedType(format!("data type code {raw}")))
}

/// A named or anonymous dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    /// Dimension name; empty for anonymous dimensions
    pub name: String,
    /// Current length
    pub length: u64,
    /// Record dimension that can grow
    pub is_unlimited: bool,
    /// Variable-length dimension
    pub is_vlen: bool,
    /// Private to one variable rather than shared in a group
    pub is_private: bool,
}

impl From<&proto::Dimension> for Dimension {
    fn from(dim: &proto::Dimension) -> Self {
        Self {
            name: dim.name.clone(),
            length: dim.length,
            is_unlimited: dim.is_unlimited,
            is_vlen: dim.is_vlen,
            is_private: dim.is_private,
        }
    }
}

/// A typed attribute of a group or variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Declared element type
    #[serde(serialize_with = "serialize_data_type")]
    pub data_type: DataType,
    /// Attribute values
    pub values: Values,
}

impl Attribute {
    fn from_wire(att: &proto::Attribute) -> Result<Self> {
        let data_type = data_type_of(att.data_type)?;
        let values = match &att.data {
            Some(data) => Values::from_wire(data, data_type, false)?,
            None => Values::from_wire(&proto::Data::default(), data_type, false)?,
        };
        Ok(Self {
            name: att.name.clone(),
            data_type,
            values,
        })
    }
}

/// A variable declaration, without its data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    /// Short name within its group
    pub name: String,
    /// Declared element type
    #[serde(serialize_with = "serialize_data_type")]
    pub data_type: DataType,
    /// Dimensions in declaration order; anonymous dimensions have an empty name
    pub dimensions: Vec<Dimension>,
    /// Variable attributes
    pub attributes: Vec<Attribute>,
    /// Integer data is to be read as unsigned
    pub unsigned: bool,
    /// Enum typedef name for enum variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
}

impl Variable {
    fn from_wire(var: &proto::Variable) -> Result<Self> {
        Ok(Self {
            name: var.name.clone(),
            data_type: data_type_of(var.data_type)?,
            dimensions: var.shapes.iter().map(Dimension::from).collect(),
            attributes: var
                .atts
                .iter()
                .map(Attribute::from_wire)
                .collect::<Result<_>>()?,
            unsigned: var.unsigned,
            enum_type: Some(var.enum_type.clone()).filter(|t| !t.is_empty()),
        })
    }
}

/// An enum type: code to label mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumTypedef {
    /// Type name
    pub name: String,
    /// Labels by code
    pub values: BTreeMap<u32, String>,
}

/// A group and everything declared in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Group name; empty for the root group
    pub name: String,
    /// Shared dimensions
    pub dimensions: Vec<Dimension>,
    /// Variables declared in this group
    pub variables: Vec<Variable>,
    /// Group attributes
    pub attributes: Vec<Attribute>,
    /// Enum typedefs
    pub enum_types: Vec<EnumTypedef>,
    /// Nested groups
    pub groups: Vec<Group>,
}

impl Group {
    /// Convert a wire group and all of its subgroups
    ///
    /// # Errors
    ///
    /// Returns an error for unknown data types or undecodable attribute values.
    pub fn from_wire(group: &proto::Group) -> Result<Self> {
        Ok(Self {
            name: group.name.clone(),
            dimensions: group.dims.iter().map(Dimension::from).collect(),
            variables: group
                .vars
                .iter()
                .map(Variable::from_wire)
                .collect::<Result<_>>()?,
            attributes: group
                .atts
                .iter()
                .map(Attribute::from_wire)
                .collect::<Result<_>>()?,
            enum_types: group
                .enum_types
                .iter()
                .map(|e| EnumTypedef {
                    name: e.name.clone(),
                    values: e.maps.iter().map(|m| (m.code, m.value.clone())).collect(),
                })
                .collect(),
            groups: group
                .groups
                .iter()
                .map(Self::from_wire)
                .collect::<Result<_>>()?,
        })
    }

    /// Find a variable by full name, e.g. `analysed_sst` or `forecast/sub/temp`
    #[must_use]
    pub fn find_variable(&self, full_name: &str) -> Option<&Variable> {
        let path = full_name.trim_start_matches('/');
        match path.split_once('/') {
            Some((group, rest)) => self
                .groups
                .iter()
                .find(|g| g.name == group)
                .and_then(|g| g.find_variable(rest)),
            None => self.variables.iter().find(|v| v.name == path),
        }
    }
}

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    /// Location as reported by the server
    pub location: String,
    /// Version of the header metadata schema
    pub metadata_version: u32,
    /// Root group
    pub root: Group,
}

impl FileHeader {
    /// Build the header model, surfacing a server-reported error
    ///
    /// # Errors
    ///
    /// Returns `Remote` if the server reported an error, `MissingHeader` if
    /// no header was sent, and decode errors for malformed metadata.
    pub fn from_response(response: &proto::HeaderResponse) -> Result<Self> {
        let header = response.header.as_ref();
        let location = header.map(|h| h.location.clone()).unwrap_or_default();

        if let Some(error) = &response.error {
            return Err(GcdmError::Remote {
                location,
                code: error.code,
                message: error.message.clone(),
            });
        }

        let header = header.ok_or_else(|| GcdmError::MissingHeader {
            location: location.clone(),
        })?;
        let root = match &header.root {
            Some(group) => Group::from_wire(group)?,
            None => Group::from_wire(&proto::Group::default())?,
        };

        Ok(Self {
            location,
            metadata_version: header.metadata_version,
            root,
        })
    }
}
