pub mod db;
mod latest;
pub mod models;
mod tables;
mod versions;

pub use db::{Database, DatabaseError};
pub use tables::*;
