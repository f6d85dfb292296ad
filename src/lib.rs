pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod order;
pub mod query;
pub mod response;
pub mod service;
pub mod vocab;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{PartchainError, Result};
pub use lookup::{Membership, RelationLookup};
pub use model::{Chain, Edge, Predicate, ResourceId, Value};
pub use order::{reconstruct, OrderReconstructor};
pub use service::{QueryService, RiSearchClient};
