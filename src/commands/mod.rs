mod info;
mod tabulate;

pub use info::info;
pub use tabulate::tabulate;
