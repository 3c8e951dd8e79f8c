pub mod rectification;
pub mod status;
