// src/processing/mod.rs
//! Digital filter design and offline simulation

pub mod dfilter;

pub use dfilter::*;
