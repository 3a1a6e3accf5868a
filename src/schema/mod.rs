pub mod catalog;
pub mod map;
pub mod mission;
pub mod plan;
