pub mod catalog;
pub mod document;

pub use catalog::{Category, CategorySection, PersonCatalog};
pub use document::Document;
