//! Task category module

mod model;
mod repository;
mod service;

pub use model::{CategoryInput, TaskCategory};
pub use repository::CategoryRepository;
pub use service::CategoryService;
