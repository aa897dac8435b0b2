//! Type descriptors for record signatures.
//!
//! On disk a descriptor is a tagged table `{ name = "...", nested = { ... } }`.
//! In memory it is a closed recursive enum; containers wrap their element type.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lower bound (inclusive) for integers appearing in assertions.
pub const INT_MIN: i64 = -2_147_483_648;
/// Upper bound (exclusive) for integers appearing in assertions.
pub const INT_MAX_EXCLUSIVE: i64 = 2_147_483_647;

/// Names accepted in the `name` field of a descriptor.
pub const TYPE_NAMES: [&str; 6] = ["string", "boolean", "integer", "float", "array", "hash"];

/// Shape of a value: primitive or a container of a nested descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawType", into = "RawType")]
pub enum TypeDescriptor {
    String,
    Boolean,
    Integer,
    Float,
    /// Ordered list of values of the nested type.
    Array(Box<TypeDescriptor>),
    /// String-keyed map whose values have the nested type.
    Hash(Box<TypeDescriptor>),
}

/// Storage form of a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nested: Option<Box<RawType>>,
}

impl TryFrom<RawType> for TypeDescriptor {
    type Error = String;

    fn try_from(raw: RawType) -> Result<Self, Self::Error> {
        let nested = raw
            .nested
            .map(|inner| TypeDescriptor::try_from(*inner))
            .transpose()?;
        match (raw.name.as_str(), nested) {
            ("string", None) => Ok(TypeDescriptor::String),
            ("boolean", None) => Ok(TypeDescriptor::Boolean),
            ("integer", None) => Ok(TypeDescriptor::Integer),
            ("float", None) => Ok(TypeDescriptor::Float),
            ("array", Some(inner)) => Ok(TypeDescriptor::Array(Box::new(inner))),
            ("hash", Some(inner)) => Ok(TypeDescriptor::Hash(Box::new(inner))),
            ("array" | "hash", None) => Err(format!("type '{}' requires 'nested'", raw.name)),
            ("string" | "boolean" | "integer" | "float", Some(_)) => {
                Err(format!("type '{}' must not have 'nested'", raw.name))
            }
            (other, _) => Err(format!(
                "unknown type name '{other}' (allowed: {})",
                TYPE_NAMES.join(", ")
            )),
        }
    }
}

impl From<TypeDescriptor> for RawType {
    fn from(descriptor: TypeDescriptor) -> Self {
        let (name, nested) = match descriptor {
            TypeDescriptor::String => ("string", None),
            TypeDescriptor::Boolean => ("boolean", None),
            TypeDescriptor::Integer => ("integer", None),
            TypeDescriptor::Float => ("float", None),
            TypeDescriptor::Array(inner) => ("array", Some(Box::new(RawType::from(*inner)))),
            TypeDescriptor::Hash(inner) => ("hash", Some(Box::new(RawType::from(*inner)))),
        };
        RawType {
            name: name.to_string(),
            nested,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::String => f.write_str("string"),
            TypeDescriptor::Boolean => f.write_str("boolean"),
            TypeDescriptor::Integer => f.write_str("integer"),
            TypeDescriptor::Float => f.write_str("float"),
            TypeDescriptor::Array(inner) => write!(f, "array<{inner}>"),
            TypeDescriptor::Hash(inner) => write!(f, "hash<{inner}>"),
        }
    }
}

impl TypeDescriptor {
    /// Check that `value` has this shape. `path` names the value in errors
    /// (e.g. `arguments[0]`, `expected`).
    ///
    /// Floats are strict: an integer does not satisfy `float`.
    pub fn check(&self, value: &Value, path: &str) -> Result<(), String> {
        match (self, value) {
            (TypeDescriptor::String, Value::String(_)) => Ok(()),
            (TypeDescriptor::Boolean, Value::Bool(_)) => Ok(()),
            (TypeDescriptor::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (TypeDescriptor::Float, Value::Number(n)) if n.is_f64() => Ok(()),
            (TypeDescriptor::Array(inner), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    inner.check(item, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            (TypeDescriptor::Hash(inner), Value::Object(map)) => {
                for (key, item) in map {
                    inner.check(item, &format!("{path}.{key}"))?;
                }
                Ok(())
            }
            _ => Err(format!(
                "{path} expected {self}, got {}",
                json_kind(value)
            )),
        }
    }

    /// Check that every value typed `integer` fits `[INT_MIN, INT_MAX_EXCLUSIVE)`.
    ///
    /// Values of the wrong shape are ignored here; [`TypeDescriptor::check`]
    /// reports those.
    pub fn check_int_bounds(&self, value: &Value, path: &str) -> Result<(), String> {
        match (self, value) {
            (TypeDescriptor::Integer, Value::Number(n)) => {
                let in_range = n
                    .as_i64()
                    .is_some_and(|v| (INT_MIN..INT_MAX_EXCLUSIVE).contains(&v));
                if in_range || n.is_f64() {
                    Ok(())
                } else {
                    Err(format!(
                        "{path}: integer {n} is out of range [{INT_MIN}, {INT_MAX_EXCLUSIVE})"
                    ))
                }
            }
            (TypeDescriptor::Array(inner), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    inner.check_int_bounds(item, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            (TypeDescriptor::Hash(inner), Value::Object(map)) => {
                for (key, item) in map {
                    inner.check_int_bounds(item, &format!("{path}.{key}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Short human name for the JSON kind of a value.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "hash",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(input: &str) -> Result<TypeDescriptor, String> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(rename = "type")]
            ty: TypeDescriptor,
        }
        toml::from_str::<Wrapper>(input)
            .map(|wrapper| wrapper.ty)
            .map_err(|err| err.to_string())
    }

    #[test]
    fn parses_nested_containers() {
        let ty = parse(
            r#"type = { name = "array", nested = { name = "hash", nested = { name = "integer" } } }"#,
        )
        .expect("descriptor");
        assert_eq!(
            ty,
            TypeDescriptor::Array(Box::new(TypeDescriptor::Hash(Box::new(
                TypeDescriptor::Integer
            ))))
        );
        assert_eq!(ty.to_string(), "array<hash<integer>>");
    }

    #[test]
    fn rejects_unknown_name() {
        let err = parse(r#"type = { name = "tuple" }"#).expect_err("unknown name");
        assert!(err.contains("unknown type name 'tuple'"), "{err}");
    }

    #[test]
    fn rejects_container_without_nested() {
        let err = parse(r#"type = { name = "array" }"#).expect_err("missing nested");
        assert!(err.contains("requires 'nested'"), "{err}");
    }

    #[test]
    fn rejects_primitive_with_nested() {
        let err = parse(r#"type = { name = "integer", nested = { name = "string" } }"#)
            .expect_err("primitive nested");
        assert!(err.contains("must not have 'nested'"), "{err}");
    }

    #[test]
    fn serializes_to_canonical_objects() {
        let ty = TypeDescriptor::Hash(Box::new(TypeDescriptor::Array(Box::new(
            TypeDescriptor::String,
        ))));
        let value = serde_json::to_value(&ty).expect("serialize");
        assert_eq!(
            value,
            json!({"name": "hash", "nested": {"name": "array", "nested": {"name": "string"}}})
        );
        let primitive = serde_json::to_value(TypeDescriptor::Float).expect("serialize");
        assert_eq!(primitive, json!({"name": "float"}));
    }

    #[test]
    fn check_distinguishes_integer_and_float() {
        assert!(TypeDescriptor::Integer.check(&json!(3), "v").is_ok());
        assert!(TypeDescriptor::Integer.check(&json!(3.0), "v").is_err());
        assert!(TypeDescriptor::Float.check(&json!(3.0), "v").is_ok());
        assert!(TypeDescriptor::Float.check(&json!(3), "v").is_err());
        assert!(TypeDescriptor::Boolean.check(&json!(1), "v").is_err());
    }

    #[test]
    fn check_reports_nested_path() {
        let ty = TypeDescriptor::Hash(Box::new(TypeDescriptor::Array(Box::new(
            TypeDescriptor::Integer,
        ))));
        let err = ty
            .check(&json!({"a": [1, 2], "b": [3, "x"]}), "expected")
            .expect_err("mismatch");
        assert_eq!(err, "expected.b[1] expected integer, got string");
    }

    #[test]
    fn int_bounds_are_half_open() {
        let ty = TypeDescriptor::Array(Box::new(TypeDescriptor::Integer));
        assert!(ty.check_int_bounds(&json!([INT_MIN, 0]), "v").is_ok());
        let err = ty
            .check_int_bounds(&json!([1, INT_MAX_EXCLUSIVE]), "v")
            .expect_err("upper bound is exclusive");
        assert!(err.starts_with("v[1]: integer 2147483647"), "{err}");
    }
}
