#![allow(dead_code, unused_imports)]

pub use relmodel_relation::testing::*;
