//! Canonical, generation-independent provider schema model.
//!
//! Every wire generation is translated into these types. The JSON layout
//! mirrors the familiar provider-schema document (`block`, `attributes`,
//! `block_types`, `nesting_mode`, compact `type` signatures) so output can be
//! consumed by existing tooling.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::SemanticType;

/// The full schema advertised by one provider plugin.
///
/// Absent categories are `None` rather than empty maps so callers can tell
/// "the plugin declared nothing" apart from "the plugin sent an empty map".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchema {
    /// Schema of the provider configuration block.
    #[serde(rename = "provider", default, skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_schemas: Option<BTreeMap<String, Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_schemas: Option<BTreeMap<String, Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_resource_schemas: Option<BTreeMap<String, Block>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<BTreeMap<String, FunctionSignature>>,
}

impl ProviderSchema {
    pub fn resource(&self, name: &str) -> Option<&Block> {
        self.resource_schemas.as_ref()?.get(name)
    }

    pub fn data_source(&self, name: &str) -> Option<&Block> {
        self.data_source_schemas.as_ref()?.get(name)
    }

    pub fn ephemeral_resource(&self, name: &str) -> Option<&Block> {
        self.ephemeral_resource_schemas.as_ref()?.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.as_ref()?.get(name)
    }

    /// Sorted names declared in one category; `None` when the category is absent.
    pub fn names(&self, category: SchemaCategory) -> Option<Vec<String>> {
        let names = match category {
            SchemaCategory::Resource => self.resource_schemas.as_ref()?.keys().cloned().collect(),
            SchemaCategory::DataSource => self.data_source_schemas.as_ref()?.keys().cloned().collect(),
            SchemaCategory::EphemeralResource => self.ephemeral_resource_schemas.as_ref()?.keys().cloned().collect(),
            SchemaCategory::Function => self.functions.as_ref()?.keys().cloned().collect(),
        };
        Some(names)
    }
}

/// Named schema categories exposed by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaCategory {
    Resource,
    DataSource,
    EphemeralResource,
    Function,
}

impl SchemaCategory {
    pub fn display(&self) -> &'static str {
        match self {
            SchemaCategory::Resource => "resource",
            SchemaCategory::DataSource => "data source",
            SchemaCategory::EphemeralResource => "ephemeral resource",
            SchemaCategory::Function => "function",
        }
    }
}

impl fmt::Display for SchemaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// How a description string should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    #[default]
    Plain,
    Markdown,
}

/// Repetition and grouping semantics of a nested block or nested attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    #[default]
    Single,
    Group,
    List,
    Set,
    Map,
}

/// A configuration block: attributes plus nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Schema version; for top-level schemas this is the declared schema version.
    #[serde(default)]
    pub version: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub description_kind: DescriptionKind,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    /// Attributes in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<IndexMap<String, Attribute>>,

    /// Nested block types in declaration order.
    #[serde(rename = "block_types", default, skip_serializing_if = "Option::is_none")]
    pub nested_blocks: Option<IndexMap<String, NestedBlockType>>,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.as_ref()?.get(name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlockType> {
        self.nested_blocks.as_ref()?.get(name)
    }
}

/// A single attribute of a block or nested object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type; absent for nested attributes or when the signature failed to decode.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<SemanticType>,

    /// Nested attribute structure (generation B only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_type: Option<NestedObjectType>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub description_kind: DescriptionKind,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,
}

/// A nested block declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedBlockType {
    pub nesting_mode: NestingMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_items: u64,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_items: u64,
}

/// A nested attribute type: attributes grouped under a nesting mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedObjectType {
    pub nesting_mode: NestingMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<IndexMap<String, Attribute>>,
}

/// Signature of a provider-defined function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deprecation_message: String,

    /// Positional parameters, in call order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<FunctionParameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variadic_parameter: Option<FunctionParameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<SemanticType>,
}

/// One function parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(rename = "is_nullable", default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<SemanticType>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ProviderSchema {
        let mut attributes = IndexMap::new();
        attributes.insert(
            "name".to_string(),
            Attribute {
                attribute_type: Some(SemanticType::string()),
                required: true,
                ..Attribute::default()
            },
        );
        let block = Block {
            version: 1,
            attributes: Some(attributes),
            ..Block::default()
        };
        let mut resources = BTreeMap::new();
        resources.insert("example_b".to_string(), block.clone());
        resources.insert("example_a".to_string(), block);
        ProviderSchema {
            resource_schemas: Some(resources),
            ..ProviderSchema::default()
        }
    }

    #[test]
    fn absent_categories_are_none() {
        let schema = sample();
        assert!(schema.data_source_schemas.is_none());
        assert_eq!(schema.names(SchemaCategory::Function), None);
        assert_eq!(
            schema.names(SchemaCategory::Resource),
            Some(vec!["example_a".to_string(), "example_b".to_string()])
        );
    }

    #[test]
    fn lookups_by_name() {
        let schema = sample();
        let block = schema.resource("example_a").expect("resource present");
        assert!(block.attribute("name").expect("attribute").required);
        assert!(schema.resource("missing").is_none());
        assert!(schema.function("anything").is_none());
    }

    #[test]
    fn serializes_in_provider_schema_layout() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value["resource_schemas"]["example_a"],
            json!({
                "version": 1,
                "description_kind": "plain",
                "attributes": {
                    "name": { "type": "string", "description_kind": "plain", "required": true }
                }
            })
        );
        assert!(value.get("data_source_schemas").is_none());
    }

    #[test]
    fn deserializes_back_to_the_same_model() {
        let schema = sample();
        let text = serde_json::to_string(&schema).unwrap();
        let parsed: ProviderSchema = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn nesting_mode_names_are_lowercase() {
        assert_eq!(serde_json::to_value(NestingMode::Group).unwrap(), json!("group"));
        assert_eq!(NestingMode::default(), NestingMode::Single);
        assert_eq!(DescriptionKind::default(), DescriptionKind::Plain);
    }
}
