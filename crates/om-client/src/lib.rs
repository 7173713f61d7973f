//! # om-client — configurator REST client
//!
//! Thin action creators over the configurator's `/v0` API. Each call
//! shapes its request against the resource schema, sends it through a
//! [`Transport`], waits out asynchronous lifecycle transitions and answers
//! an [`om_core::ActionResult`] envelope.
//!
//! ```text
//! Configurator ──► ServiceApi / NodeApi / PipelineApi / InspectApi
//!      │                 │ settle: accept → wait → re-read
//!      ▼                 ▼
//!  Transport  ◄──── wait::wait (poll until Expect holds)
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod inspect;
pub mod node;
pub mod pipeline;
pub mod service;
pub mod transport;
pub mod url;
pub mod wait;

pub use client::{Configurator, KeyOf, ResourceApi};
pub use config::{ClientConfig, WaitConfig};
pub use error::ClientError;
pub use inspect::{ClassInfo, InspectApi, ServiceInfo};
pub use node::NodeApi;
pub use pipeline::PipelineApi;
pub use service::ServiceApi;
pub use transport::{HttpTransport, Method, Request, Response, Transport};
pub use wait::{Expect, WaitRequest};
