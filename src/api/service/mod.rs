pub mod access_control;
pub mod database_service;
pub mod enforcement_gate;
pub mod grant_store;
pub mod rights_resolver;
pub mod view_projector;

pub use access_control::{AccessControl, GrantRequest};
pub use database_service::DatabaseService;
pub use enforcement_gate::{Action, EnforcementGate, Verdict};
pub use grant_store::{GrantStore, UserGrants};
pub use rights_resolver::{RightsResolver, UserRights};
pub use view_projector::ViewRightsProjector;
