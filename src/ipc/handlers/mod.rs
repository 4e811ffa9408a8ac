pub mod core;
pub mod directory;
pub mod tables;
