//! Domain layer for the catalog context.

pub mod catalog;
pub mod markup;
pub mod model;
