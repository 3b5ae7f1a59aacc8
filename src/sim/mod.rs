pub mod data;
pub mod event;
pub mod frame;
pub mod ports;
pub mod step;
pub mod world;
