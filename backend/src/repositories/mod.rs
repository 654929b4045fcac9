//! Persistence layer: store abstractions and their SQLite implementations.

pub mod account_repository;
