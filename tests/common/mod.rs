#![allow(dead_code)]

pub mod fixtures;
pub mod stubs;

pub use fixtures::*;
pub use stubs::*;
