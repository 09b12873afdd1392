//! Побайтовое чтение/запись полей схемы.

pub mod read;
pub mod write;

pub use read::*;
pub use write::*;
