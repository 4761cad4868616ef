//! Generation-specific leaf accessors over the wire messages.
//!
//! The translation walk in the parent module only sees these traits; each
//! generation supplies the field reads and the enum mapping for its own
//! message types.

use std::collections::HashMap;

use provschema_types::{DescriptionKind, NestingMode};

use crate::wire::{BlockNesting, Diagnostic, StringKind, v5, v6};

pub trait WireResponse {
    type Schema: WireSchema;
    type Function: WireFunction;

    fn provider(&self) -> Option<&Self::Schema>;
    fn resource_schemas(&self) -> &HashMap<String, Self::Schema>;
    fn data_source_schemas(&self) -> &HashMap<String, Self::Schema>;
    fn ephemeral_resource_schemas(&self) -> &HashMap<String, Self::Schema>;
    fn functions(&self) -> &HashMap<String, Self::Function>;
    fn diagnostics(&self) -> &[Diagnostic];
}

pub trait WireSchema {
    type Block: WireBlock;

    fn version(&self) -> i64;
    fn block(&self) -> Option<&Self::Block>;
}

pub trait WireBlock: Sized {
    type Attribute: WireAttribute;
    type NestedBlock: WireNestedBlock<Block = Self>;

    fn version(&self) -> i64;
    fn attributes(&self) -> &[Self::Attribute];
    fn block_types(&self) -> &[Self::NestedBlock];
    fn description(&self) -> &str;
    fn description_kind(&self) -> DescriptionKind;
    fn deprecated(&self) -> bool;
}

pub trait WireAttribute: Sized {
    type Object: WireObject<Attribute = Self>;

    fn name(&self) -> &str;
    /// Raw JSON type signature; empty when the attribute is nested.
    fn type_signature(&self) -> &[u8];
    fn nested_type(&self) -> Option<&Self::Object>;
    fn description(&self) -> &str;
    fn description_kind(&self) -> DescriptionKind;
    fn required(&self) -> bool;
    fn optional(&self) -> bool;
    fn computed(&self) -> bool;
    fn sensitive(&self) -> bool;
    fn deprecated(&self) -> bool;
    fn write_only(&self) -> bool;
}

pub trait WireNestedBlock {
    type Block: WireBlock;

    fn type_name(&self) -> &str;
    fn block(&self) -> Option<&Self::Block>;
    fn nesting(&self) -> NestingMode;
    fn min_items(&self) -> i64;
    fn max_items(&self) -> i64;
}

pub trait WireObject {
    type Attribute: WireAttribute;

    fn attributes(&self) -> &[Self::Attribute];
    fn nesting(&self) -> NestingMode;
}

pub trait WireFunction {
    type Parameter: WireParameter;

    fn parameters(&self) -> &[Self::Parameter];
    fn variadic_parameter(&self) -> Option<&Self::Parameter>;
    fn return_type(&self) -> Option<&[u8]>;
    fn summary(&self) -> &str;
    fn description(&self) -> &str;
    fn deprecation_message(&self) -> &str;
}

pub trait WireParameter {
    fn name(&self) -> &str;
    fn type_signature(&self) -> &[u8];
    fn allows_null(&self) -> bool;
    fn description(&self) -> &str;
}

/// Unset or unrecognized kinds render as plain text.
pub(crate) fn description_kind(value: i32) -> DescriptionKind {
    match StringKind::try_from(value) {
        Ok(StringKind::Markdown) => DescriptionKind::Markdown,
        _ => DescriptionKind::Plain,
    }
}

/// Invalid or unrecognized nesting is treated as single.
pub(crate) fn block_nesting(value: i32) -> NestingMode {
    match BlockNesting::try_from(value) {
        Ok(BlockNesting::List) => NestingMode::List,
        Ok(BlockNesting::Set) => NestingMode::Set,
        Ok(BlockNesting::Map) => NestingMode::Map,
        Ok(BlockNesting::Group) => NestingMode::Group,
        _ => NestingMode::Single,
    }
}

pub(crate) fn object_nesting(value: i32) -> NestingMode {
    match v6::ObjectNesting::try_from(value) {
        Ok(v6::ObjectNesting::List) => NestingMode::List,
        Ok(v6::ObjectNesting::Set) => NestingMode::Set,
        Ok(v6::ObjectNesting::Map) => NestingMode::Map,
        _ => NestingMode::Single,
    }
}

/// Accessors whose field layout is identical on both generations.
macro_rules! shared_accessors {
    ($wire:ident) => {
        impl WireResponse for $wire::GetProviderSchemaResponse {
            type Schema = $wire::Schema;
            type Function = $wire::Function;

            fn provider(&self) -> Option<&Self::Schema> {
                self.provider.as_ref()
            }
            fn resource_schemas(&self) -> &HashMap<String, Self::Schema> {
                &self.resource_schemas
            }
            fn data_source_schemas(&self) -> &HashMap<String, Self::Schema> {
                &self.data_source_schemas
            }
            fn ephemeral_resource_schemas(&self) -> &HashMap<String, Self::Schema> {
                &self.ephemeral_resource_schemas
            }
            fn functions(&self) -> &HashMap<String, Self::Function> {
                &self.functions
            }
            fn diagnostics(&self) -> &[Diagnostic] {
                &self.diagnostics
            }
        }

        impl WireSchema for $wire::Schema {
            type Block = $wire::Block;

            fn version(&self) -> i64 {
                self.version
            }
            fn block(&self) -> Option<&Self::Block> {
                self.block.as_ref()
            }
        }

        impl WireBlock for $wire::Block {
            type Attribute = $wire::Attribute;
            type NestedBlock = $wire::NestedBlock;

            fn version(&self) -> i64 {
                self.version
            }
            fn attributes(&self) -> &[Self::Attribute] {
                &self.attributes
            }
            fn block_types(&self) -> &[Self::NestedBlock] {
                &self.block_types
            }
            fn description(&self) -> &str {
                &self.description
            }
            fn description_kind(&self) -> DescriptionKind {
                description_kind(self.description_kind)
            }
            fn deprecated(&self) -> bool {
                self.deprecated
            }
        }

        impl WireNestedBlock for $wire::NestedBlock {
            type Block = $wire::Block;

            fn type_name(&self) -> &str {
                &self.type_name
            }
            fn block(&self) -> Option<&Self::Block> {
                self.block.as_ref()
            }
            fn nesting(&self) -> NestingMode {
                block_nesting(self.nesting)
            }
            fn min_items(&self) -> i64 {
                self.min_items
            }
            fn max_items(&self) -> i64 {
                self.max_items
            }
        }

        impl WireFunction for $wire::Function {
            type Parameter = $wire::Parameter;

            fn parameters(&self) -> &[Self::Parameter] {
                &self.parameters
            }
            fn variadic_parameter(&self) -> Option<&Self::Parameter> {
                self.variadic_parameter.as_ref()
            }
            fn return_type(&self) -> Option<&[u8]> {
                self.r#return.as_ref().map(|ret| ret.r#type.as_slice())
            }
            fn summary(&self) -> &str {
                &self.summary
            }
            fn description(&self) -> &str {
                &self.description
            }
            fn deprecation_message(&self) -> &str {
                &self.deprecation_message
            }
        }

        impl WireParameter for $wire::Parameter {
            fn name(&self) -> &str {
                &self.name
            }
            fn type_signature(&self) -> &[u8] {
                &self.r#type
            }
            fn allows_null(&self) -> bool {
                self.allow_null_value
            }
            fn description(&self) -> &str {
                &self.description
            }
        }
    };
}

shared_accessors!(v5);
shared_accessors!(v6);

/// Attribute accessors that do not depend on nested attribute support.
macro_rules! attribute_accessors {
    () => {
        fn name(&self) -> &str {
            &self.name
        }
        fn type_signature(&self) -> &[u8] {
            &self.r#type
        }
        fn description(&self) -> &str {
            &self.description
        }
        fn description_kind(&self) -> DescriptionKind {
            description_kind(self.description_kind)
        }
        fn required(&self) -> bool {
            self.required
        }
        fn optional(&self) -> bool {
            self.optional
        }
        fn computed(&self) -> bool {
            self.computed
        }
        fn sensitive(&self) -> bool {
            self.sensitive
        }
        fn deprecated(&self) -> bool {
            self.deprecated
        }
        fn write_only(&self) -> bool {
            self.write_only
        }
    };
}

impl WireAttribute for v6::Attribute {
    type Object = v6::Object;

    attribute_accessors!();

    fn nested_type(&self) -> Option<&Self::Object> {
        self.nested_type.as_ref()
    }
}

impl WireObject for v6::Object {
    type Attribute = v6::Attribute;

    fn attributes(&self) -> &[Self::Attribute] {
        &self.attributes
    }
    fn nesting(&self) -> NestingMode {
        object_nesting(self.nesting)
    }
}

/// Generation A has no nested attribute types; this type has no values.
#[derive(Debug)]
pub enum NoNestedType {}

impl WireObject for NoNestedType {
    type Attribute = v5::Attribute;

    fn attributes(&self) -> &[Self::Attribute] {
        match *self {}
    }
    fn nesting(&self) -> NestingMode {
        match *self {}
    }
}

impl WireAttribute for v5::Attribute {
    type Object = NoNestedType;

    attribute_accessors!();

    fn nested_type(&self) -> Option<&Self::Object> {
        None
    }
}
