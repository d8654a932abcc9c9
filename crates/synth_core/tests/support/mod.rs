#![allow(dead_code)]

pub mod sources;
pub mod topology;
