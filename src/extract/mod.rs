pub mod category;
mod context;
pub mod element;
pub mod extractor;

pub use category::{Category, UnknownCategory};
pub use element::{CategorizedInventory, UiElement, UniquenessContext};
pub use extractor::{extract, extract_with_base};
