//! Helper functions shared by the generator and the server

mod date;

pub use date::*;
