//! User module
//!
//! Users, their roles, and the manager capability gate.

mod gate;
mod model;
mod repository;
mod service;

pub use gate::{AuthorizationGate, Capability, UserDirectoryGate};
pub use model::{normalize_email, NewUser, Role, User};
pub use repository::UserRepository;
pub use service::UserService;
