mod result;
pub mod sql;

pub use result::Result;
