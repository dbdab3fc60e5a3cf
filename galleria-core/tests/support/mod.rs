//! Shared fixtures for core integration tests.
#![allow(dead_code)]

pub mod catalog;
pub mod fixtures;
