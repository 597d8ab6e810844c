pub mod traits;

// Backend implementations
pub mod memory;
pub mod rest;
