mod lazy;
mod mutex;
mod once;

pub use lazy::*;
pub use mutex::*;
pub use once::*;
