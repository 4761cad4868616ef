//! Protobuf wire messages for the schema RPC of both protocol generations.
//!
//! Only the messages reachable from the schema call are declared. Field tags
//! match the published `tfplugin5` / `tfplugin6` definitions; fields this
//! crate does not read are left undeclared and skipped by the decoder.

pub mod v5;
pub mod v6;

use crate::types::Generation;

/// Rendering of a description string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum StringKind {
    Plain = 0,
    Markdown = 1,
}

/// Nesting of a nested block (`Schema.NestedBlock.NestingMode`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BlockNesting {
    Invalid = 0,
    Single = 1,
    List = 2,
    Set = 3,
    Map = 4,
    Group = 5,
}

/// Severity of a diagnostic returned alongside a schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Severity {
    Invalid = 0,
    Error = 1,
    Warning = 2,
}

/// Diagnostic message; identical on both generations.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Diagnostic {
    #[prost(enumeration = "Severity", tag = "1")]
    pub severity: i32,
    #[prost(string, tag = "2")]
    pub summary: String,
    #[prost(string, tag = "3")]
    pub detail: String,
}

/// The schema RPC of one generation: request/response types and method path.
pub trait SchemaMethod: Send + 'static {
    type Request: prost::Message + Default + Send + Sync + 'static;
    type Response: prost::Message + Default + Send + Sync + 'static;

    const GENERATION: Generation;
    const PATH: &'static str;
}

/// `tfplugin5.Provider/GetSchema`.
#[derive(Debug)]
pub struct GetSchemaV5;

impl SchemaMethod for GetSchemaV5 {
    type Request = v5::GetProviderSchemaRequest;
    type Response = v5::GetProviderSchemaResponse;

    const GENERATION: Generation = Generation::A;
    const PATH: &'static str = "/tfplugin5.Provider/GetSchema";
}

/// `tfplugin6.Provider/GetProviderSchema`.
#[derive(Debug)]
pub struct GetProviderSchemaV6;

impl SchemaMethod for GetProviderSchemaV6 {
    type Request = v6::GetProviderSchemaRequest;
    type Response = v6::GetProviderSchemaResponse;

    const GENERATION: Generation = Generation::B;
    const PATH: &'static str = "/tfplugin6.Provider/GetProviderSchema";
}
