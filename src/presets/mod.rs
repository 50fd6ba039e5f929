//! Ready-made grammars: an araucaria tree on the string grammar and a city
//! grid on the shape grammar.

pub mod araucaria;
pub mod city;

pub use araucaria::Araucaria;
pub use city::{City, CityConfig, Density};
