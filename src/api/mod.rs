pub mod service;

pub use service::{AccessControl, Action, DatabaseService, GrantRequest, Verdict};
