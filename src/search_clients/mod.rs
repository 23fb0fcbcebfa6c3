pub mod memory;
pub mod opensearch;
