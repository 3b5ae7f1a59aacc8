pub mod entity;
pub mod mode;
pub mod rect;
pub mod stage;
pub mod stats;
