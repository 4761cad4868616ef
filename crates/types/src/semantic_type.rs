//! Semantic value types and the compact JSON type signature decoder.
//!
//! Plugins describe the shape of attribute, parameter and return values with a
//! JSON "type signature" sent as opaque bytes. The modern encoding is strict and
//! arbitrarily nested:
//!
//! ```text
//! "string"
//! ["list", "number"]
//! ["object", {"name": "string", "tags": ["map", "string"]}]
//! ["object", {"name": "string"}, ["name"]]      // optional attributes
//! ["tuple", ["string", "bool"]]
//! ```
//!
//! A looser historical encoding (`{"list": "string"}`, `{"object": {"a": "number"}}`)
//! is accepted as a fallback with primitive leaves only.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding a type signature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeSignatureError {
    #[error("empty type signature")]
    Empty,

    #[error("type signature is not valid JSON: {0}")]
    Json(String),

    #[error("unsupported primitive type: {0}")]
    UnknownPrimitive(String),

    #[error("unsupported type kind: {0}")]
    UnknownKind(String),

    #[error("invalid type description: {0}")]
    Malformed(String),
}

impl TypeSignatureError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

/// Primitive leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Number,
    Bool,
}

impl PrimitiveType {
    /// Name used in the wire encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Bool => "bool",
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = TypeSignatureError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "string" => Ok(PrimitiveType::String),
            "number" => Ok(PrimitiveType::Number),
            "bool" => Ok(PrimitiveType::Bool),
            other => Err(TypeSignatureError::UnknownPrimitive(other.to_string())),
        }
    }
}

/// Attribute types of an object, plus the names flagged optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub attributes: BTreeMap<String, SemanticType>,
    pub optional: BTreeSet<String>,
}

impl ObjectType {
    pub fn new(attributes: BTreeMap<String, SemanticType>) -> Self {
        Self {
            attributes,
            optional: BTreeSet::new(),
        }
    }
}

/// Structured description of a value's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    Primitive(PrimitiveType),
    /// Any type; decided by the value at runtime.
    Dynamic,
    List(Box<SemanticType>),
    Set(Box<SemanticType>),
    Map(Box<SemanticType>),
    Object(ObjectType),
    Tuple(Vec<SemanticType>),
}

impl SemanticType {
    pub fn string() -> Self {
        SemanticType::Primitive(PrimitiveType::String)
    }

    pub fn number() -> Self {
        SemanticType::Primitive(PrimitiveType::Number)
    }

    pub fn bool() -> Self {
        SemanticType::Primitive(PrimitiveType::Bool)
    }

    pub fn list(element: SemanticType) -> Self {
        SemanticType::List(Box::new(element))
    }

    pub fn set(element: SemanticType) -> Self {
        SemanticType::Set(Box::new(element))
    }

    pub fn map(element: SemanticType) -> Self {
        SemanticType::Map(Box::new(element))
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, SemanticType)>,
        K: Into<String>,
    {
        SemanticType::Object(ObjectType::new(
            attributes.into_iter().map(|(name, ty)| (name.into(), ty)).collect(),
        ))
    }

    /// Decode the strict, arbitrarily nested encoding from a parsed JSON value.
    pub fn from_json_value(value: &Value) -> Result<Self, TypeSignatureError> {
        match value {
            Value::String(name) if name == "dynamic" => Ok(SemanticType::Dynamic),
            Value::String(name) => name.parse().map(SemanticType::Primitive),
            Value::Array(items) => decode_strict_array(items),
            other => Err(TypeSignatureError::malformed(format!("unexpected JSON value {other}"))),
        }
    }
}

fn decode_strict_array(items: &[Value]) -> Result<SemanticType, TypeSignatureError> {
    let Some(Value::String(kind)) = items.first() else {
        return Err(TypeSignatureError::malformed("type array must start with a kind name"));
    };

    match kind.as_str() {
        "list" | "set" | "map" => {
            let [_, element] = items else {
                return Err(TypeSignatureError::malformed(format!("{kind} expects exactly one element type")));
            };
            let element = Box::new(SemanticType::from_json_value(element)?);
            Ok(match kind.as_str() {
                "list" => SemanticType::List(element),
                "set" => SemanticType::Set(element),
                _ => SemanticType::Map(element),
            })
        }
        "object" => {
            if !(2..=3).contains(&items.len()) {
                return Err(TypeSignatureError::malformed("object expects attribute types and optional names"));
            }
            let Value::Object(raw_attributes) = &items[1] else {
                return Err(TypeSignatureError::malformed("object attribute types must be a JSON object"));
            };
            let mut object = ObjectType::default();
            for (name, raw) in raw_attributes {
                object.attributes.insert(name.clone(), SemanticType::from_json_value(raw)?);
            }
            if let Some(raw_optional) = items.get(2) {
                let Value::Array(names) = raw_optional else {
                    return Err(TypeSignatureError::malformed("optional attribute names must be an array"));
                };
                for name in names {
                    let Value::String(name) = name else {
                        return Err(TypeSignatureError::malformed("optional attribute name must be a string"));
                    };
                    if !object.attributes.contains_key(name) {
                        return Err(TypeSignatureError::malformed(format!("optional attribute {name} is not declared")));
                    }
                    object.optional.insert(name.clone());
                }
            }
            Ok(SemanticType::Object(object))
        }
        "tuple" => {
            let [_, Value::Array(elements)] = items else {
                return Err(TypeSignatureError::malformed("tuple expects an array of element types"));
            };
            elements
                .iter()
                .map(SemanticType::from_json_value)
                .collect::<Result<Vec<_>, _>>()
                .map(SemanticType::Tuple)
        }
        other => Err(TypeSignatureError::UnknownKind(other.to_string())),
    }
}

/// Decode raw type signature bytes.
///
/// The strict encoding is tried first; when it fails the historical
/// single-key-object encoding is attempted. If both fail the strict error is
/// returned. Empty input is always an error.
pub fn decode_type_signature(bytes: &[u8]) -> Result<SemanticType, TypeSignatureError> {
    if bytes.is_empty() {
        return Err(TypeSignatureError::Empty);
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|error| TypeSignatureError::Json(error.to_string()))?;

    match SemanticType::from_json_value(&value) {
        Ok(decoded) => Ok(decoded),
        Err(strict_error) => decode_tolerant(&value).map_err(|_| strict_error),
    }
}

fn decode_tolerant(value: &Value) -> Result<SemanticType, TypeSignatureError> {
    match value {
        Value::String(name) => name.parse().map(SemanticType::Primitive),
        Value::Object(entries) => {
            let mut iter = entries.iter();
            match (iter.next(), iter.next()) {
                (Some((kind, inner)), None) => decode_tolerant_entry(kind, inner),
                _ => Err(TypeSignatureError::malformed("expected a single-key object")),
            }
        }
        _ => Err(TypeSignatureError::malformed("invalid complex type description")),
    }
}

fn decode_tolerant_entry(kind: &str, inner: &Value) -> Result<SemanticType, TypeSignatureError> {
    match (kind, inner) {
        ("list", Value::String(name)) => Ok(SemanticType::list(SemanticType::Primitive(name.parse()?))),
        ("set", Value::String(name)) => Ok(SemanticType::set(SemanticType::Primitive(name.parse()?))),
        ("map", Value::String(name)) => Ok(SemanticType::map(SemanticType::Primitive(name.parse()?))),
        ("object", Value::Object(raw_attributes)) => {
            let mut attributes = BTreeMap::new();
            for (name, raw) in raw_attributes {
                let Value::String(primitive) = raw else {
                    return Err(TypeSignatureError::malformed(format!("invalid object attribute type for {name}")));
                };
                attributes.insert(name.clone(), SemanticType::Primitive(primitive.parse()?));
            }
            Ok(SemanticType::Object(ObjectType::new(attributes)))
        }
        _ => Err(TypeSignatureError::malformed("invalid complex type description")),
    }
}

impl Serialize for SemanticType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SemanticType::Primitive(primitive) => serializer.serialize_str(primitive.as_str()),
            SemanticType::Dynamic => serializer.serialize_str("dynamic"),
            SemanticType::List(element) | SemanticType::Set(element) | SemanticType::Map(element) => {
                let kind = match self {
                    SemanticType::List(_) => "list",
                    SemanticType::Set(_) => "set",
                    _ => "map",
                };
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(kind)?;
                seq.serialize_element(element.as_ref())?;
                seq.end()
            }
            SemanticType::Object(object) => {
                let len = if object.optional.is_empty() { 2 } else { 3 };
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element("object")?;
                seq.serialize_element(&object.attributes)?;
                if !object.optional.is_empty() {
                    seq.serialize_element(&object.optional)?;
                }
                seq.end()
            }
            SemanticType::Tuple(elements) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("tuple")?;
                seq.serialize_element(elements)?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for SemanticType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SemanticType::from_json_value(&value).map_err(D::Error::custom)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Primitive(primitive) => f.write_str(primitive.as_str()),
            SemanticType::Dynamic => f.write_str("any"),
            SemanticType::List(element) => write!(f, "list({element})"),
            SemanticType::Set(element) => write!(f, "set({element})"),
            SemanticType::Map(element) => write!(f, "map({element})"),
            SemanticType::Object(object) => {
                f.write_str("object({")?;
                for (index, (name, ty)) in object.attributes.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    if object.optional.contains(name) {
                        write!(f, "{name}=optional({ty})")?;
                    } else {
                        write!(f, "{name}={ty}")?;
                    }
                }
                f.write_str("})")
            }
            SemanticType::Tuple(elements) => {
                f.write_str("tuple([")?;
                for (index, ty) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("])")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(ty: &SemanticType) -> SemanticType {
        let bytes = serde_json::to_vec(ty).expect("encode type");
        decode_type_signature(&bytes).expect("decode type")
    }

    #[test]
    fn strict_round_trip_primitives_and_containers() {
        let cases = [
            SemanticType::string(),
            SemanticType::number(),
            SemanticType::bool(),
            SemanticType::list(SemanticType::string()),
            SemanticType::set(SemanticType::number()),
            SemanticType::map(SemanticType::bool()),
        ];
        for ty in cases {
            assert_eq!(round_trip(&ty), ty);
        }
    }

    #[test]
    fn strict_round_trip_nested_object_of_lists() {
        let inner = SemanticType::object([
            ("ports", SemanticType::list(SemanticType::number())),
            ("names", SemanticType::set(SemanticType::string())),
        ]);
        let ty = SemanticType::object([("rules", SemanticType::list(inner)), ("enabled", SemanticType::bool())]);
        assert_eq!(round_trip(&ty), ty);
    }

    #[test]
    fn strict_decodes_wire_encoding() {
        let ty = decode_type_signature(br#"["map",["list","string"]]"#).unwrap();
        assert_eq!(ty, SemanticType::map(SemanticType::list(SemanticType::string())));

        let ty = decode_type_signature(br#"["object",{"a":"string","b":"number"},["b"]]"#).unwrap();
        let SemanticType::Object(object) = &ty else {
            panic!("expected object, got {ty:?}");
        };
        assert_eq!(object.attributes.len(), 2);
        assert!(object.optional.contains("b"));
    }

    #[test]
    fn strict_decodes_dynamic_and_tuple() {
        assert_eq!(decode_type_signature(br#""dynamic""#).unwrap(), SemanticType::Dynamic);
        let ty = decode_type_signature(br#"["tuple",["string","bool"]]"#).unwrap();
        assert_eq!(ty, SemanticType::Tuple(vec![SemanticType::string(), SemanticType::bool()]));
    }

    #[test]
    fn tolerant_fallback_accepts_single_key_objects() {
        assert_eq!(
            decode_type_signature(br#"{"list":"string"}"#).unwrap(),
            SemanticType::list(SemanticType::string())
        );
        assert_eq!(
            decode_type_signature(br#"{"set":"bool"}"#).unwrap(),
            SemanticType::set(SemanticType::bool())
        );
        assert_eq!(
            decode_type_signature(br#"{"object":{"a":"number"}}"#).unwrap(),
            SemanticType::object([("a", SemanticType::number())])
        );
    }

    #[test]
    fn tolerant_fallback_rejects_nesting() {
        assert!(decode_type_signature(br#"{"list":{"list":"string"}}"#).is_err());
        assert!(decode_type_signature(br#"{"object":{"a":["list","string"]}}"#).is_err());
        assert!(decode_type_signature(br#"{"list":"string","set":"string"}"#).is_err());
    }

    #[test]
    fn empty_and_unknown_inputs_fail() {
        assert_eq!(decode_type_signature(b""), Err(TypeSignatureError::Empty));
        assert_eq!(
            decode_type_signature(br#""float""#),
            Err(TypeSignatureError::UnknownPrimitive("float".to_string()))
        );
        assert!(matches!(
            decode_type_signature(br#"["vector","string"]"#),
            Err(TypeSignatureError::UnknownKind(_))
        ));
        assert!(matches!(decode_type_signature(b"not json"), Err(TypeSignatureError::Json(_))));
        assert!(decode_type_signature(br#"["list"]"#).is_err());
    }

    #[test]
    fn display_is_readable() {
        let ty = SemanticType::object([("a", SemanticType::list(SemanticType::string()))]);
        assert_eq!(ty.to_string(), "object({a=list(string)})");
    }
}
