//! Core library for TaskDesk
//!
//! This crate contains the task-tracking business logic, including:
//! - The task status machine and its role-gated mutations
//! - The filter/sort/pagination query builder for task listings
//! - The manager capability gate
//! - Repository traits and a file-backed record store

pub mod category;
pub mod error;
pub mod store;
pub mod task;
pub mod user;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
