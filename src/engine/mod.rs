pub mod controller;
pub mod trading_loop;

pub use controller::*;
pub use trading_loop::*;
