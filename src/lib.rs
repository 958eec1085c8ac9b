#![warn(clippy::all, rust_2018_idioms)]

pub mod catalog;
pub mod circuit;
pub mod codegen;
pub mod diag;
pub mod emit;
pub mod grid;
pub mod hierarchy;
pub mod naming;
pub mod resolver;
pub use codegen::{Program, compile};
