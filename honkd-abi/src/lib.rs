//! Circuit ABI types and witness-map encoding.
//!
//! A circuit's ABI declares an ordered list of named, typed parameters. The
//! encoder flattens a tree of caller-supplied input values into the ordered,
//! densely indexed map of `0x`-prefixed field elements the proving pipeline
//! consumes. Index assignment follows schema declaration order; the insertion
//! order of the input mapping never affects the result.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Maximum schema nesting depth the encoder will traverse.
///
/// Schemas are caller-controlled, so recursion has to be bounded.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Ordered witness assignment: contiguous indices to `0x`-prefixed hex values.
pub type WitnessMap = BTreeMap<u32, String>;

/// Named input values supplied by the caller, keyed by parameter name.
pub type InputMap = BTreeMap<String, InputValue>;

/// A circuit ABI: the ordered list of parameters the circuit expects.
///
/// Deserialized from the `abi` object of a compiled circuit artifact; fields
/// other than `parameters` (return types, visibility maps) are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct Abi {
    pub parameters: Vec<AbiParameter>,
}

/// A single named, typed ABI parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawAbiParameter")]
pub struct AbiParameter {
    pub name: String,
    pub ty: AbiType,
}

/// Type descriptor for an ABI parameter.
///
/// The wire shape is `{"kind": "...", "length"?, "width"?, "type"?, "fields"?}`.
/// Unknown kinds deserialize into [`AbiType::Unsupported`] so the encoder can
/// report them by name instead of failing at parse time, far from the
/// encoding contract.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawAbiType")]
pub enum AbiType {
    Field {
        width: Option<u32>,
    },
    Integer {
        width: Option<u32>,
    },
    Array {
        length: u32,
        element: Box<AbiType>,
    },
    String {
        length: u32,
    },
    Struct {
        fields: Vec<AbiParameter>,
    },
    Unsupported {
        kind: String,
    },
}

impl AbiType {
    pub fn kind(&self) -> &str {
        match self {
            AbiType::Field { .. } => "field",
            AbiType::Integer { .. } => "integer",
            AbiType::Array { .. } => "array",
            AbiType::String { .. } => "string",
            AbiType::Struct { .. } => "struct",
            AbiType::Unsupported { kind } => kind,
        }
    }

    fn width(&self) -> Option<u32> {
        match self {
            AbiType::Field { width } | AbiType::Integer { width } => *width,
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawAbiType {
    kind: String,
    #[serde(default)]
    length: Option<u32>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default, rename = "type")]
    element: Option<Box<RawAbiType>>,
    #[serde(default)]
    fields: Option<Vec<RawAbiParameter>>,
}

#[derive(Deserialize)]
struct RawAbiParameter {
    name: String,
    #[serde(rename = "type")]
    ty: RawAbiType,
}

impl TryFrom<RawAbiType> for AbiType {
    type Error = String;

    fn try_from(raw: RawAbiType) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "field" => Ok(AbiType::Field { width: raw.width }),
            "integer" => Ok(AbiType::Integer { width: raw.width }),
            "array" => {
                let length = raw
                    .length
                    .ok_or_else(|| "array type descriptor is missing its length".to_string())?;
                let element = raw
                    .element
                    .ok_or_else(|| "array type descriptor is missing its element type".to_string())?;
                Ok(AbiType::Array {
                    length,
                    element: Box::new(AbiType::try_from(*element)?),
                })
            }
            "string" => {
                let length = raw
                    .length
                    .ok_or_else(|| "string type descriptor is missing its length".to_string())?;
                Ok(AbiType::String { length })
            }
            "struct" => {
                let fields = raw
                    .fields
                    .ok_or_else(|| "struct type descriptor is missing its fields".to_string())?;
                let fields = fields
                    .into_iter()
                    .map(AbiParameter::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AbiType::Struct { fields })
            }
            _ => Ok(AbiType::Unsupported { kind: raw.kind }),
        }
    }
}

impl TryFrom<RawAbiParameter> for AbiParameter {
    type Error = String;

    fn try_from(raw: RawAbiParameter) -> Result<Self, Self::Error> {
        Ok(AbiParameter {
            name: raw.name,
            ty: AbiType::try_from(raw.ty)?,
        })
    }
}

/// A dynamically-typed input value.
///
/// Variant order matters: serde tries untagged variants top to bottom.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Sequence(Vec<InputValue>),
    Mapping(BTreeMap<String, InputValue>),
}

impl InputValue {
    fn kind(&self) -> &'static str {
        match self {
            InputValue::Null => "null",
            InputValue::Bool(_) => "boolean",
            InputValue::Number(_) => "number",
            InputValue::Text(_) => "string",
            InputValue::Sequence(_) => "array",
            InputValue::Mapping(_) => "object",
        }
    }
}

/// Validation failures raised while encoding inputs against an ABI.
///
/// Every variant names the full parameter path (`outer.inner[3]`) of the
/// offending value. The first failure aborts the whole encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WitnessError {
    #[error("missing parameter: {path}")]
    MissingParameter { path: String },

    #[error("type mismatch for parameter {path}: expected {expected}, got {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error(
        "unsupported number size for parameter {path}: width {width} exceeds 64 bits, \
         use a hexadecimal string instead"
    )]
    UnsupportedWidth { path: String, width: u32 },

    #[error("length mismatch for parameter {path}: expected {expected} values, got {found}")]
    LengthMismatch {
        path: String,
        expected: u64,
        found: u64,
    },

    #[error("unsupported parameter type for {path}: kind '{kind}'")]
    UnsupportedType { path: String, kind: String },

    #[error("schema nesting for parameter {path} exceeds {limit} levels")]
    NestingTooDeep { path: String, limit: usize },
}

impl WitnessError {
    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            WitnessError::MissingParameter { .. } => "WITNESS_MISSING_PARAMETER",
            WitnessError::TypeMismatch { .. } => "WITNESS_TYPE_MISMATCH",
            WitnessError::UnsupportedWidth { .. } => "WITNESS_UNSUPPORTED_WIDTH",
            WitnessError::LengthMismatch { .. } => "WITNESS_LENGTH_MISMATCH",
            WitnessError::UnsupportedType { .. } => "WITNESS_UNSUPPORTED_TYPE",
            WitnessError::NestingTooDeep { .. } => "WITNESS_NESTING_TOO_DEEP",
        }
    }
}

/// Flattened length of an entire parameter list, computed from the schema
/// alone. A successful encoding always produces exactly this many indices.
pub fn abi_total_length(parameters: &[AbiParameter]) -> u64 {
    parameters.iter().map(|p| type_total_length(&p.ty)).sum()
}

/// Flattened length of a single type descriptor.
pub fn type_total_length(ty: &AbiType) -> u64 {
    match ty {
        AbiType::Field { .. } | AbiType::Integer { .. } => 1,
        AbiType::String { length } => u64::from(*length),
        AbiType::Array { length, element } => u64::from(*length) * type_total_length(element),
        AbiType::Struct { fields } => fields.iter().map(|f| type_total_length(&f.ty)).sum(),
        AbiType::Unsupported { .. } => 0,
    }
}

/// Encode named inputs against an ABI parameter list into a witness map.
///
/// Indices are assigned contiguously from `start_index` in schema declaration
/// order. The encoding is deterministic and side-effect free; re-running with
/// identical arguments yields a byte-identical map.
pub fn encode_inputs(
    inputs: &InputMap,
    parameters: &[AbiParameter],
    start_index: u32,
) -> Result<WitnessMap, WitnessError> {
    let values = encode_parameters(inputs, parameters, "", 0)?;
    let mut witness = WitnessMap::new();
    for (offset, value) in values.into_iter().enumerate() {
        witness.insert(start_index + offset as u32, value);
    }
    Ok(witness)
}

/// Encode every parameter in declaration order, returning the flattened
/// field-element values. Callers assign indices, so nested struct encodings
/// compose without threading a mutable counter through the recursion.
fn encode_parameters(
    inputs: &BTreeMap<String, InputValue>,
    parameters: &[AbiParameter],
    prefix: &str,
    depth: usize,
) -> Result<Vec<String>, WitnessError> {
    let mut values = Vec::new();
    for parameter in parameters {
        let path = join_path(prefix, &parameter.name);
        let value = inputs
            .get(&parameter.name)
            .ok_or_else(|| WitnessError::MissingParameter { path: path.clone() })?;
        values.extend(encode_value(value, &parameter.ty, &path, depth)?);
    }
    Ok(values)
}

fn encode_value(
    value: &InputValue,
    ty: &AbiType,
    path: &str,
    depth: usize,
) -> Result<Vec<String>, WitnessError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(WitnessError::NestingTooDeep {
            path: path.to_string(),
            limit: MAX_NESTING_DEPTH,
        });
    }

    match ty {
        AbiType::Field { width } | AbiType::Integer { width } => {
            Ok(vec![encode_scalar(value, *width, path)?])
        }

        AbiType::Array { element, .. } => {
            let InputValue::Sequence(elements) = value else {
                return Err(WitnessError::TypeMismatch {
                    path: path.to_string(),
                    expected: "array".to_string(),
                    found: value.kind().to_string(),
                });
            };

            let mut flat = Vec::new();
            flatten_array(elements, element, path, depth + 1, &mut flat)?;

            // Length is validated against the schema after the full flatten,
            // before any scalar conversion.
            let expected = type_total_length(ty);
            if flat.len() as u64 != expected {
                return Err(WitnessError::LengthMismatch {
                    path: path.to_string(),
                    expected,
                    found: flat.len() as u64,
                });
            }

            flat.into_iter()
                .map(|(unit_path, unit)| match unit {
                    FlatUnit::Encoded(value) => Ok(value),
                    FlatUnit::Raw(value, width) => encode_scalar(&value, width, &unit_path),
                })
                .collect()
        }

        AbiType::Struct { fields } => match value {
            InputValue::Mapping(mapping) => encode_parameters(mapping, fields, path, depth + 1),
            other => Err(WitnessError::TypeMismatch {
                path: path.to_string(),
                expected: "struct".to_string(),
                found: other.kind().to_string(),
            }),
        },

        AbiType::String { length } => match value {
            InputValue::Text(text) => {
                let chars: Vec<char> = text.chars().collect();
                // No implicit padding for a top-level string parameter;
                // padding only happens for strings nested inside arrays.
                if chars.len() as u64 != u64::from(*length) {
                    return Err(WitnessError::LengthMismatch {
                        path: path.to_string(),
                        expected: u64::from(*length),
                        found: chars.len() as u64,
                    });
                }
                Ok(chars.iter().map(|c| format!("0x{:x}", *c as u32)).collect())
            }
            other => Err(WitnessError::TypeMismatch {
                path: path.to_string(),
                expected: "string".to_string(),
                found: other.kind().to_string(),
            }),
        },

        AbiType::Unsupported { kind } => Err(WitnessError::UnsupportedType {
            path: path.to_string(),
            kind: kind.clone(),
        }),
    }
}

/// A flattened array unit awaiting index assignment.
enum FlatUnit {
    /// Scalar still to be converted, with the declared bit width of its
    /// element descriptor.
    Raw(InputValue, Option<u32>),
    /// Already in canonical hex form (expanded string characters, encoded
    /// struct fields).
    Encoded(String),
}

/// Depth-first flatten of a (possibly multi-dimensional) array input.
///
/// Strings expand to one unit per declared character position, zero-padded;
/// structs contribute their encoded field values in declaration order.
fn flatten_array(
    elements: &[InputValue],
    element_ty: &AbiType,
    path: &str,
    depth: usize,
    out: &mut Vec<(String, FlatUnit)>,
) -> Result<(), WitnessError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(WitnessError::NestingTooDeep {
            path: path.to_string(),
            limit: MAX_NESTING_DEPTH,
        });
    }

    for (i, element) in elements.iter().enumerate() {
        let element_path = format!("{path}[{i}]");
        match (element, element_ty) {
            (InputValue::Sequence(inner), AbiType::Array { element: inner_ty, .. }) => {
                flatten_array(inner, inner_ty, &element_path, depth + 1, out)?;
            }
            (InputValue::Sequence(_), _) => {
                return Err(WitnessError::TypeMismatch {
                    path: element_path,
                    expected: element_ty.kind().to_string(),
                    found: "array".to_string(),
                });
            }
            (InputValue::Text(text), AbiType::String { length }) => {
                let chars: Vec<char> = text.chars().collect();
                for position in 0..*length as usize {
                    let code = chars.get(position).map(|c| *c as u32).unwrap_or(0);
                    out.push((
                        format!("{element_path}[{position}]"),
                        FlatUnit::Encoded(format!("0x{code:x}")),
                    ));
                }
            }
            (InputValue::Mapping(mapping), AbiType::Struct { fields }) => {
                let encoded = encode_parameters(mapping, fields, &element_path, depth + 1)?;
                out.extend(
                    encoded
                        .into_iter()
                        .map(|value| (element_path.clone(), FlatUnit::Encoded(value))),
                );
            }
            (other, AbiType::Struct { .. }) => {
                return Err(WitnessError::TypeMismatch {
                    path: element_path,
                    expected: "struct".to_string(),
                    found: other.kind().to_string(),
                });
            }
            (_, AbiType::Unsupported { kind }) => {
                return Err(WitnessError::UnsupportedType {
                    path: element_path,
                    kind: kind.clone(),
                });
            }
            (other, _) => {
                out.push((element_path, FlatUnit::Raw(other.clone(), element_ty.width())));
            }
        }
    }
    Ok(())
}

/// Convert one scalar input into its canonical hex form.
///
/// Plain numbers are floored before rendering, matching the wire behavior the
/// proving pipeline was built against. `0x`-prefixed strings pass through
/// byte-for-byte, preserving case.
fn encode_scalar(
    value: &InputValue,
    width: Option<u32>,
    path: &str,
) -> Result<String, WitnessError> {
    match value {
        InputValue::Number(number) => {
            if let Some(width) = width {
                if width > 64 {
                    return Err(WitnessError::UnsupportedWidth {
                        path: path.to_string(),
                        width,
                    });
                }
            }
            if !number.is_finite() || *number < 0.0 {
                return Err(WitnessError::TypeMismatch {
                    path: path.to_string(),
                    expected: "non-negative number".to_string(),
                    found: number.to_string(),
                });
            }
            Ok(format!("0x{:x}", number.floor() as u128))
        }
        InputValue::Text(text) => {
            if text.starts_with("0x") {
                Ok(text.clone())
            } else {
                Err(WitnessError::TypeMismatch {
                    path: path.to_string(),
                    expected: "hexadecimal string".to_string(),
                    found: "string".to_string(),
                })
            }
        }
        other => Err(WitnessError::TypeMismatch {
            path: path.to_string(),
            expected: "integer".to_string(),
            found: other.kind().to_string(),
        }),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> AbiType {
        AbiType::Field { width: None }
    }

    fn param(name: &str, ty: AbiType) -> AbiParameter {
        AbiParameter {
            name: name.to_string(),
            ty,
        }
    }

    fn number(value: f64) -> InputValue {
        InputValue::Number(value)
    }

    fn text(value: &str) -> InputValue {
        InputValue::Text(value.to_string())
    }

    fn inputs(entries: Vec<(&str, InputValue)>) -> InputMap {
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn encodes_plain_number_as_lowercase_hex() {
        let params = vec![param("x", field())];
        let witness = encode_inputs(&inputs(vec![("x", number(255.0))]), &params, 0).unwrap();
        assert_eq!(witness, WitnessMap::from([(0, "0xff".to_string())]));
    }

    #[test]
    fn passes_hex_strings_through_verbatim() {
        let params = vec![param("x", field())];
        let witness = encode_inputs(&inputs(vec![("x", text("0xFF"))]), &params, 0).unwrap();
        assert_eq!(witness[&0], "0xFF");
    }

    #[test]
    fn floors_fractional_numbers() {
        let params = vec![param("x", field())];
        let witness = encode_inputs(&inputs(vec![("x", number(3.7))]), &params, 0).unwrap();
        assert_eq!(witness[&0], "0x3");
    }

    #[test]
    fn rejects_negative_numbers() {
        let params = vec![param("x", field())];
        let err = encode_inputs(&inputs(vec![("x", number(-3.0))]), &params, 0).unwrap_err();
        assert!(matches!(err, WitnessError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_wide_numeric_literals() {
        let params = vec![param("x", AbiType::Integer { width: Some(128) })];
        let err = encode_inputs(&inputs(vec![("x", number(5.0))]), &params, 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::UnsupportedWidth {
                path: "x".to_string(),
                width: 128,
            }
        );

        // Wide values are fine as hex strings.
        let witness = encode_inputs(&inputs(vec![("x", text("0xdeadbeef"))]), &params, 0).unwrap();
        assert_eq!(witness[&0], "0xdeadbeef");
    }

    #[test]
    fn rejects_non_hex_strings_for_numeric_parameters() {
        let params = vec![param("x", field())];
        let err = encode_inputs(&inputs(vec![("x", text("255"))]), &params, 0).unwrap_err();
        assert!(matches!(err, WitnessError::TypeMismatch { .. }));
    }

    #[test]
    fn reports_missing_parameters_before_shape_checks() {
        let params = vec![param("x", field()), param("y", field())];
        let err = encode_inputs(&inputs(vec![("x", number(1.0))]), &params, 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::MissingParameter {
                path: "y".to_string(),
            }
        );
    }

    #[test]
    fn flattens_nested_arrays_depth_first() {
        let ty = AbiType::Array {
            length: 2,
            element: Box::new(AbiType::Array {
                length: 2,
                element: Box::new(field()),
            }),
        };
        let params = vec![param("grid", ty)];
        let value = InputValue::Sequence(vec![
            InputValue::Sequence(vec![number(1.0), number(2.0)]),
            InputValue::Sequence(vec![number(3.0), number(4.0)]),
        ]);
        let witness = encode_inputs(&inputs(vec![("grid", value)]), &params, 0).unwrap();
        assert_eq!(
            witness,
            WitnessMap::from([
                (0, "0x1".to_string()),
                (1, "0x2".to_string()),
                (2, "0x3".to_string()),
                (3, "0x4".to_string()),
            ])
        );
    }

    #[test]
    fn pads_strings_nested_inside_arrays() {
        let ty = AbiType::Array {
            length: 1,
            element: Box::new(AbiType::String { length: 4 }),
        };
        let params = vec![param("names", ty)];
        let value = InputValue::Sequence(vec![text("ab")]);
        let witness = encode_inputs(&inputs(vec![("names", value)]), &params, 0).unwrap();
        assert_eq!(
            witness,
            WitnessMap::from([
                (0, "0x61".to_string()),
                (1, "0x62".to_string()),
                (2, "0x0".to_string()),
                (3, "0x0".to_string()),
            ])
        );
    }

    #[test]
    fn rejects_arrays_with_wrong_flattened_length() {
        let ty = AbiType::Array {
            length: 3,
            element: Box::new(field()),
        };
        let params = vec![param("xs", ty)];
        let value = InputValue::Sequence(vec![number(1.0), number(2.0)]);
        let err = encode_inputs(&inputs(vec![("xs", value)]), &params, 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::LengthMismatch {
                path: "xs".to_string(),
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn encodes_structs_in_field_declaration_order() {
        let ty = AbiType::Struct {
            fields: vec![param("a", field()), param("b", field())],
        };
        let params = vec![param("point", ty)];
        // Mapping key order is irrelevant; only field declaration order counts.
        let value = InputValue::Mapping(
            [
                ("b".to_string(), number(2.0)),
                ("a".to_string(), number(1.0)),
            ]
            .into_iter()
            .collect(),
        );
        let witness = encode_inputs(&inputs(vec![("point", value)]), &params, 5).unwrap();
        assert_eq!(
            witness,
            WitnessMap::from([(5, "0x1".to_string()), (6, "0x2".to_string())])
        );
    }

    #[test]
    fn names_nested_paths_in_errors() {
        let ty = AbiType::Struct {
            fields: vec![param(
                "inner",
                AbiType::Struct {
                    fields: vec![param("value", field())],
                },
            )],
        };
        let params = vec![param("outer", ty)];
        let value = InputValue::Mapping(
            [(
                "inner".to_string(),
                InputValue::Mapping(BTreeMap::new()),
            )]
            .into_iter()
            .collect(),
        );
        let err = encode_inputs(&inputs(vec![("outer", value)]), &params, 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::MissingParameter {
                path: "outer.inner.value".to_string(),
            }
        );
    }

    #[test]
    fn encodes_structs_nested_inside_arrays() {
        let ty = AbiType::Array {
            length: 2,
            element: Box::new(AbiType::Struct {
                fields: vec![param("a", field()), param("b", field())],
            }),
        };
        let params = vec![param("points", ty)];
        let point = |a: f64, b: f64| {
            InputValue::Mapping(
                [
                    ("a".to_string(), number(a)),
                    ("b".to_string(), number(b)),
                ]
                .into_iter()
                .collect(),
            )
        };
        let value = InputValue::Sequence(vec![point(1.0, 2.0), point(3.0, 4.0)]);
        let witness = encode_inputs(&inputs(vec![("points", value)]), &params, 0).unwrap();
        assert_eq!(
            witness,
            WitnessMap::from([
                (0, "0x1".to_string()),
                (1, "0x2".to_string()),
                (2, "0x3".to_string()),
                (3, "0x4".to_string()),
            ])
        );
    }

    #[test]
    fn top_level_strings_require_exact_length() {
        let params = vec![param("name", AbiType::String { length: 4 })];
        let err = encode_inputs(&inputs(vec![("name", text("ab"))]), &params, 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::LengthMismatch {
                path: "name".to_string(),
                expected: 4,
                found: 2,
            }
        );

        let witness = encode_inputs(&inputs(vec![("name", text("abcd"))]), &params, 0).unwrap();
        assert_eq!(witness[&0], "0x61");
        assert_eq!(witness[&3], "0x64");
    }

    #[test]
    fn unknown_kinds_surface_as_unsupported_type() {
        let parameter: AbiParameter =
            serde_json::from_str(r#"{"name": "t", "type": {"kind": "tuple"}}"#).unwrap();
        let err = encode_inputs(&inputs(vec![("t", number(1.0))]), &[parameter], 0).unwrap_err();
        assert_eq!(
            err,
            WitnessError::UnsupportedType {
                path: "t".to_string(),
                kind: "tuple".to_string(),
            }
        );
    }

    #[test]
    fn parses_circuit_abi_json() {
        let abi: Abi = serde_json::from_str(
            r#"{
                "parameters": [
                    {"name": "secret", "type": {"kind": "field"}},
                    {"name": "amount", "type": {"kind": "integer", "width": 64}},
                    {"name": "path", "type": {
                        "kind": "array",
                        "length": 2,
                        "type": {"kind": "field"}
                    }},
                    {"name": "memo", "type": {"kind": "string", "length": 3}},
                    {"name": "owner", "type": {"kind": "struct", "fields": [
                        {"name": "id", "type": {"kind": "field"}}
                    ]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(abi.parameters.len(), 5);
        assert_eq!(abi_total_length(&abi.parameters), 1 + 1 + 2 + 3 + 1);
    }

    #[test]
    fn assigns_contiguous_indices_from_the_start_offset() {
        let params = vec![
            param("a", field()),
            param(
                "b",
                AbiType::Array {
                    length: 2,
                    element: Box::new(field()),
                },
            ),
            param("c", AbiType::String { length: 2 }),
        ];
        let input = inputs(vec![
            ("a", number(7.0)),
            (
                "b",
                InputValue::Sequence(vec![number(1.0), number(2.0)]),
            ),
            ("c", text("hi")),
        ]);

        let witness = encode_inputs(&input, &params, 10).unwrap();
        let expected_len = abi_total_length(&params);
        assert_eq!(witness.len() as u64, expected_len);
        let indices: Vec<u32> = witness.keys().copied().collect();
        assert_eq!(indices, (10..10 + expected_len as u32).collect::<Vec<_>>());
    }

    #[test]
    fn encoding_is_deterministic() {
        let params = vec![
            param("a", field()),
            param(
                "b",
                AbiType::Struct {
                    fields: vec![param("x", field()), param("y", field())],
                },
            ),
        ];
        let input = inputs(vec![
            ("a", number(1.0)),
            (
                "b",
                InputValue::Mapping(
                    [
                        ("x".to_string(), number(2.0)),
                        ("y".to_string(), number(3.0)),
                    ]
                    .into_iter()
                    .collect(),
                ),
            ),
        ]);

        let first = encode_inputs(&input, &params, 0).unwrap();
        let second = encode_inputs(&input, &params, 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_schemas_nested_past_the_depth_limit() {
        let mut ty = field();
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            ty = AbiType::Array {
                length: 1,
                element: Box::new(ty),
            };
        }
        let mut value = number(1.0);
        for _ in 0..(MAX_NESTING_DEPTH + 2) {
            value = InputValue::Sequence(vec![value]);
        }
        let params = vec![param("deep", ty)];
        let err = encode_inputs(&inputs(vec![("deep", value)]), &params, 0).unwrap_err();
        assert!(matches!(err, WitnessError::NestingTooDeep { .. }));
    }
}
