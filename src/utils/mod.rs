pub mod data;
pub mod extractor;
