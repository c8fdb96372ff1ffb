pub mod arguments;
pub mod bumper;
pub mod config;
pub mod indentation;
pub mod release;
pub mod setters;
