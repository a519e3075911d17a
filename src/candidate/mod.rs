pub mod candidate_model;
pub mod filter;
