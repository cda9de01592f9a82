pub mod error;
pub mod naming;
pub mod sites;
