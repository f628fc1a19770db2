// Life of a request:
// 1. The request path comes in
// 2. The tenant segment following the configured marker is extracted
// 3. The registry returns the tenant's realm deployment:
//     - Cache hit: return the shared deployment
//     - Cache miss: fetch the tenant record, build it, cache it
// 4. Failures are mapped to a status code by the HTTP layer
//
// System components:
//  - Path extraction
//  - Realm registry (deployment cache)
//  - Record providers and deployment builders

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod realm_registry;
pub mod tenant_path;

mod e2e_tests;

pub use error::{ErrorKind, ResolveError};
pub use realm_registry::RealmRegistry;
