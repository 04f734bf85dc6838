#![forbid(unsafe_code)]

pub mod index;
pub mod repository;
pub mod sqlite;
