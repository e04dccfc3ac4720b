// Requests - Typed descriptors for every built-in management group

pub mod enumeration;
pub mod file;
pub mod image;
pub mod os;
pub mod shell;
pub mod statistics;
