//! Command line interface.

pub mod build;
pub mod create;
pub mod inspect;
pub mod parameters;
pub mod query;
pub mod run;
pub mod subset;
pub mod utils;
