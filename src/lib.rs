//! Build Temoa energy system model databases from tabular scenario inputs.
#![warn(missing_docs)]
pub mod batch;
pub mod cases;
pub mod cli;
pub mod database;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod perturbation;
pub mod pipeline;
pub mod relation;
pub mod scenario;
pub mod schedule;
pub mod settings;
pub mod technology;
pub mod value;

#[cfg(test)]
mod fixture;
