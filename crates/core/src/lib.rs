#![forbid(unsafe_code)]

pub mod ids;
pub mod tags;
pub mod trees;
