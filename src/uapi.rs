mod common;

pub use common::*;

pub mod v1;
