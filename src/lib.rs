//! Round-based ranked-choice and single transferable vote tabulation.

pub mod config;
pub mod formats;
pub mod model;
pub mod reports;
pub mod tabulator;
pub mod util;
