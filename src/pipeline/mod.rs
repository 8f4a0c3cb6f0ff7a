pub mod kit;
pub mod persistence;
pub mod project;
