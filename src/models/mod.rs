pub mod catalog;
pub mod types;

pub use catalog::{catalog, ModelCatalog};
pub use types::{ModelDescriptor, ModelRequirements, ModelSource};
