pub mod domain;
pub mod persist;
pub mod protocol;
