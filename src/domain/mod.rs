//! Typed entities built from the declarative input documents.
//!
//! Entities are constructed once per run, handed to the synthesizers and
//! dropped; nothing here is mutated after parsing.

pub mod mtls;
pub mod sni_proxy;

pub use mtls::{ListenerTimeouts, MtlsBackendSpec, MtlsGatewaySpec, MtlsListenerSpec, SpiffeMatch};
pub use sni_proxy::{ListenerProtocol, ListenerSpec, ProxyProtocol, VirtualHostSpec};
