//! Utility functions and types

pub mod data_loader;
pub mod stats;

pub use data_loader::{DataLoader, DataSaver, TableFormat};
