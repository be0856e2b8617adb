//! Generated API surface: authorization policy, contract views, and the
//! route set the registry installs per schema.

pub mod auth;
pub mod contracts;
pub mod surface;

pub use auth::{Actor, AuthRequirement, Operation};
pub use contracts::{ContractField, SchemaContracts};
pub use surface::{CustomRoute, RouteSet, RouteSpec};
