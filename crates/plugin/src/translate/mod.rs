//! Translation from either wire generation into the canonical [`ProviderSchema`].
//!
//! One walk serves both generations; it reads the wire tree only through the
//! accessor traits in [`access`].

pub mod access;

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use provschema_types::{
    Attribute, Block, FunctionParameter, FunctionSignature, NestedBlockType, NestedObjectType, ProviderSchema,
    SemanticType, decode_type_signature,
};
use tracing::{debug, warn};

use crate::wire::{Diagnostic, Severity};
use access::{
    WireAttribute, WireBlock, WireFunction, WireNestedBlock, WireObject, WireParameter, WireResponse, WireSchema,
};

/// Translate a schema response into the canonical model.
///
/// Never fails: undecodable type signatures leave the affected `type` unset
/// and diagnostics are only logged.
pub fn translate<R: WireResponse>(response: &R) -> ProviderSchema {
    log_diagnostics(response.diagnostics());

    ProviderSchema {
        config_schema: response.provider().map(translate_schema),
        resource_schemas: translate_schemas(response.resource_schemas()),
        data_source_schemas: translate_schemas(response.data_source_schemas()),
        ephemeral_resource_schemas: translate_schemas(response.ephemeral_resource_schemas()),
        functions: translate_functions(response.functions()),
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match Severity::try_from(diagnostic.severity) {
            Ok(Severity::Error) => warn!(
                summary = %diagnostic.summary,
                detail = %diagnostic.detail,
                "provider returned an error diagnostic with its schema"
            ),
            _ => debug!(
                summary = %diagnostic.summary,
                detail = %diagnostic.detail,
                "provider returned a diagnostic with its schema"
            ),
        }
    }
}

fn translate_schemas<S: WireSchema>(schemas: &HashMap<String, S>) -> Option<BTreeMap<String, Block>> {
    if schemas.is_empty() {
        return None;
    }
    Some(
        schemas
            .iter()
            .map(|(name, schema)| (name.clone(), translate_schema(schema)))
            .collect(),
    )
}

/// The top-level block carries the schema's declared version.
fn translate_schema<S: WireSchema>(schema: &S) -> Block {
    let mut block = schema.block().map(translate_block).unwrap_or_default();
    block.version = schema.version();
    block
}

fn translate_block<B: WireBlock>(block: &B) -> Block {
    let nested_blocks = (!block.block_types().is_empty()).then(|| {
        block
            .block_types()
            .iter()
            .map(|nested| (nested.type_name().to_string(), translate_nested_block(nested)))
            .collect::<IndexMap<_, _>>()
    });

    Block {
        version: block.version(),
        description: block.description().to_string(),
        description_kind: block.description_kind(),
        deprecated: block.deprecated(),
        attributes: translate_attributes(block.attributes()),
        nested_blocks,
    }
}

fn translate_nested_block<N: WireNestedBlock>(nested: &N) -> NestedBlockType {
    NestedBlockType {
        nesting_mode: nested.nesting(),
        block: nested.block().map(translate_block),
        min_items: clamp_count(nested.min_items()),
        max_items: clamp_count(nested.max_items()),
    }
}

fn translate_attributes<A: WireAttribute>(attributes: &[A]) -> Option<IndexMap<String, Attribute>> {
    if attributes.is_empty() {
        return None;
    }
    Some(
        attributes
            .iter()
            .map(|attribute| (attribute.name().to_string(), translate_attribute(attribute)))
            .collect(),
    )
}

fn translate_attribute<A: WireAttribute>(attribute: &A) -> Attribute {
    Attribute {
        attribute_type: decode_signature(attribute.type_signature(), attribute.name()),
        nested_type: attribute.nested_type().map(translate_object),
        description: attribute.description().to_string(),
        description_kind: attribute.description_kind(),
        deprecated: attribute.deprecated(),
        required: attribute.required(),
        optional: attribute.optional(),
        computed: attribute.computed(),
        sensitive: attribute.sensitive(),
        write_only: attribute.write_only(),
    }
}

fn translate_object<O: WireObject>(object: &O) -> NestedObjectType {
    NestedObjectType {
        nesting_mode: object.nesting(),
        attributes: translate_attributes(object.attributes()),
    }
}

fn translate_functions<F: WireFunction>(functions: &HashMap<String, F>) -> Option<BTreeMap<String, FunctionSignature>> {
    if functions.is_empty() {
        return None;
    }
    Some(
        functions
            .iter()
            .map(|(name, function)| (name.clone(), translate_function(name, function)))
            .collect(),
    )
}

fn translate_function<F: WireFunction>(name: &str, function: &F) -> FunctionSignature {
    FunctionSignature {
        summary: function.summary().to_string(),
        description: function.description().to_string(),
        deprecation_message: function.deprecation_message().to_string(),
        parameters: function.parameters().iter().map(translate_parameter).collect(),
        variadic_parameter: function.variadic_parameter().map(translate_parameter),
        return_type: function.return_type().and_then(|bytes| decode_signature(bytes, name)),
    }
}

fn translate_parameter<P: WireParameter>(parameter: &P) -> FunctionParameter {
    FunctionParameter {
        name: parameter.name().to_string(),
        description: parameter.description().to_string(),
        nullable: parameter.allows_null(),
        parameter_type: decode_signature(parameter.type_signature(), parameter.name()),
    }
}

fn decode_signature(bytes: &[u8], element: &str) -> Option<SemanticType> {
    if bytes.is_empty() {
        return None;
    }
    match decode_type_signature(bytes) {
        Ok(semantic_type) => Some(semantic_type),
        Err(error) => {
            debug!(element, %error, "dropping undecodable type signature");
            None
        }
    }
}

fn clamp_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
