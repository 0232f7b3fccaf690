pub mod actions;
pub mod filter;
pub mod inference;
pub mod session;
pub mod spectral_model;
pub mod state;
pub mod stellar_parameters;
pub mod table;
pub mod trends;
