//! Collection of general utility functions and common traits.

pub mod token;
