//! Shared types for provider schema retrieval.
//!
//! - [`ProviderSchema`] and friends: the canonical schema model every wire
//!   generation is translated into.
//! - [`SemanticType`] and [`decode_type_signature`]: value shapes and the
//!   compact JSON type signature decoder.
//! - [`ProviderRequest`] / [`VersionsRequest`]: cache keys naming a provider.

mod request;
mod schema;
mod semantic_type;

pub use request::{DEFAULT_REGISTRY, ParseRequestError, ProviderRequest, VersionsRequest};
pub use schema::{
    Attribute, Block, DescriptionKind, FunctionParameter, FunctionSignature, NestedBlockType, NestedObjectType,
    NestingMode, ProviderSchema, SchemaCategory,
};
pub use semantic_type::{ObjectType, PrimitiveType, SemanticType, TypeSignatureError, decode_type_signature};
