pub mod catalog;
pub mod errors;
pub mod intent;
pub mod order;
pub mod ports;
