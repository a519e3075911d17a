pub mod bounds;
pub mod builder;
pub mod tree_model;
