pub mod seed;
pub mod worker;

pub use seed::*;
pub use worker::*;
