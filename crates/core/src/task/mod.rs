//! Task module
//!
//! This module contains the task model, the listing query builder and the
//! role-gated mutation engine.

mod filter;
mod model;
mod repository;
mod service;

pub use filter::*;
pub use model::*;
pub use repository::{AssignmentRepository, TaskRepository};
pub use service::TaskService;
