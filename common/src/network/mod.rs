pub mod interface;
pub mod ports;
pub mod target;
