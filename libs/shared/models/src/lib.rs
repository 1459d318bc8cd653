pub mod error;
pub mod tenant;
