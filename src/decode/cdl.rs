//! CDL-style text rendering, in the layout of `ncdump`

use super::array::Values;
use super::model::{Attribute, FileHeader, Group, Variable};
use super::DecodedFile;
use std::fmt::{self, Display, Formatter, Write};

const INDENT: &str = "  ";

impl Display for FileHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "netcdf {} {{", self.location)?;
        write_group_body(f, &self.root, 0)?;
        writeln!(f, "}}")
    }
}

impl Display for DecodedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "netcdf {} {{", self.header.location)?;
        write_group_body(f, &self.header.root, 0)?;
        writeln!(f, "data:")?;
        writeln!(f)?;
        let var = &self.variable;
        if var.section.iter().any(|r| r.start != 0 || r.stride != 1) {
            let ranges: Vec<String> = var
                .section
                .iter()
                .map(|r| {
                    let last = r.start + (r.size as u64).saturating_sub(1) * r.stride;
                    if r.stride == 1 {
                        format!("{}:{last}", r.start)
                    } else {
                        format!("{}:{last}:{}", r.start, r.stride)
                    }
                })
                .collect();
            writeln!(f, " // section ({})", ranges.join(", "))?;
        }
        writeln!(f, " {} = {} ;", var.full_name, format_values(&var.values))?;
        writeln!(f, "}}")
    }
}

fn write_group_body(f: &mut Formatter<'_>, group: &Group, depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);

    if !group.enum_types.is_empty() {
        writeln!(f, "{pad}types:")?;
        for typedef in &group.enum_types {
            let members: Vec<String> = typedef
                .values
                .iter()
                .map(|(code, name)| format!("{name} = {code}"))
                .collect();
            writeln!(f, "{pad}{INDENT}enum {} {{{}}} ;", typedef.name, members.join(", "))?;
        }
    }

    if !group.dimensions.is_empty() {
        writeln!(f, "{pad}dimensions:")?;
        for dim in &group.dimensions {
            if dim.is_unlimited {
                writeln!(
                    f,
                    "{pad}{INDENT}{} = UNLIMITED ; // ({} currently)",
                    dim.name, dim.length
                )?;
            } else {
                writeln!(f, "{pad}{INDENT}{} = {} ;", dim.name, dim.length)?;
            }
        }
    }

    if !group.variables.is_empty() {
        writeln!(f, "{pad}variables:")?;
        for var in &group.variables {
            write_variable(f, var, &pad)?;
        }
    }

    if !group.attributes.is_empty() {
        writeln!(f)?;
        writeln!(f, "{pad}// global attributes:")?;
        for att in &group.attributes {
            writeln!(f, "{pad}{INDENT}{INDENT}:{} ;", format_attribute(att))?;
        }
    }

    for sub in &group.groups {
        writeln!(f)?;
        writeln!(f, "{pad}group: {} {{", sub.name)?;
        write_group_body(f, sub, depth + 1)?;
        writeln!(f, "{pad}}} // group {}", sub.name)?;
    }
    Ok(())
}

fn write_variable(f: &mut Formatter<'_>, var: &Variable, pad: &str) -> fmt::Result {
    let type_name = var
        .enum_type
        .as_deref()
        .unwrap_or_else(|| var.data_type.cdl_name());
    let dims: Vec<String> = var
        .dimensions
        .iter()
        .map(|d| {
            if d.name.is_empty() {
                d.length.to_string()
            } else {
                d.name.clone()
            }
        })
        .collect();

    if dims.is_empty() {
        writeln!(f, "{pad}{INDENT}{type_name} {} ;", var.name)?;
    } else {
        writeln!(f, "{pad}{INDENT}{type_name} {}({}) ;", var.name, dims.join(", "))?;
    }
    for att in &var.attributes {
        writeln!(f, "{pad}{INDENT}{INDENT}{}:{} ;", var.name, format_attribute(att))?;
    }
    Ok(())
}

fn format_attribute(att: &Attribute) -> String {
    format!("{} = {}", att.name, format_values(&att.values))
}

fn join<T: Display>(values: &[T], suffix: &str) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v}{suffix}");
    }
    out
}

/// Render values the way CDL writes them: quoted text for chars and
/// strings, type suffixes for the integer types that need them
fn format_values(values: &Values) -> String {
    match values {
        Values::Char(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            format!("\"{}\"", text.trim_end_matches('\0').escape_default())
        }
        Values::String(strings) => strings
            .iter()
            .map(|s| format!("\"{}\"", s.escape_default()))
            .collect::<Vec<_>>()
            .join(", "),
        Values::Byte(v) => join(v, "b"),
        Values::Ubyte(v) => join(v, "UB"),
        Values::Short(v) => join(v, "s"),
        Values::Ushort(v) => join(v, "US"),
        Values::Int(v) => join(v, ""),
        Values::Uint(v) => join(v, "U"),
        Values::Long(v) => join(v, "L"),
        Values::Ulong(v) => join(v, "UL"),
        Values::Float(v) => join(v, "f"),
        Values::Double(v) => join(v, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::model::Dimension;
    use crate::decode::{DecodedVariable, SectionRange};
    use crate::proto::DataType;

    fn sample() -> DecodedFile {
        let sst = Variable {
            name: "analysed_sst".to_string(),
            data_type: DataType::Short,
            dimensions: vec![Dimension {
                name: "time".to_string(),
                length: 2,
                is_unlimited: true,
                is_vlen: false,
                is_private: false,
            }],
            attributes: vec![Attribute {
                name: "units".to_string(),
                data_type: DataType::Char,
                values: Values::Char(b"kelvin".to_vec()),
            }],
            unsigned: false,
            enum_type: None,
        };
        DecodedFile {
            header: FileHeader {
                location: "./test/data/test.nc".to_string(),
                metadata_version: 1,
                root: Group {
                    name: String::new(),
                    dimensions: sst.dimensions.clone(),
                    variables: vec![sst.clone()],
                    attributes: Vec::new(),
                    enum_types: Vec::new(),
                    groups: Vec::new(),
                },
            },
            variable: DecodedVariable {
                full_name: "analysed_sst".to_string(),
                data_type: DataType::Short,
                dimensions: vec!["time".to_string()],
                attributes: sst.attributes,
                section: vec![SectionRange {
                    start: 0,
                    size: 2,
                    stride: 1,
                }],
                shape: vec![2],
                values: Values::Short(vec![271, -5]),
            },
        }
    }

    #[test]
    fn test_cdl_dump() {
        let text = sample().to_string();
        assert!(text.starts_with("netcdf ./test/data/test.nc {\n"));
        assert!(text.contains("  time = UNLIMITED ; // (2 currently)\n"));
        assert!(text.contains("  short analysed_sst(time) ;\n"));
        assert!(text.contains("    analysed_sst:units = \"kelvin\" ;\n"));
        assert!(text.contains(" analysed_sst = 271s, -5s ;\n"));
        assert!(!text.contains("// section"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_partial_section_is_noted() {
        let mut file = sample();
        file.variable.section[0].start = 4;
        assert!(file.to_string().contains(" // section (4:5)\n"));
    }
}
