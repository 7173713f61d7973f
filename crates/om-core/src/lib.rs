//! # om-core — resource model of the ohara console
//!
//! Pure, synchronous building blocks shared by the client and the state
//! containers:
//!
//! - [`model`]: typed resources (services, nodes, pipelines) and keys.
//! - [`schema`]: request field lists, coercions and setting definitions.
//! - [`envelope`]: the `{ data, errors, title }` action result.
//! - [`reducer`]: cached state and the `(state, action) -> state` function.
//! - [`validate`]: form-level field checks.

pub mod envelope;
pub mod model;
pub mod reducer;
pub mod schema;
pub mod validate;

pub use envelope::{ActionResult, ApiError, Subject, Verb};
pub use model::{
    ElementKind, Node, ObjectKey, Pipeline, PipelineService, Resource, ResourceKind, Service,
    ServiceState, DEFAULT_GROUP,
};
pub use reducer::{reduce, Action, Operation, Payload, Routine, StoreState};
pub use schema::{FieldSpec, FieldType, Schema, SchemaError, SettingDefinition};
