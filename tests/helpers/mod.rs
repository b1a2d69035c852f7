#![allow(dead_code)]

pub mod api_test_helper;
pub mod fleet_builder;
