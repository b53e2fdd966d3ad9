pub mod trading;
pub mod order;
pub mod position;
pub mod candle;
pub mod indicator;
pub mod signal;
pub mod regime;
pub mod closed_trade;

pub use trading::*;
pub use order::*;
pub use position::*;
pub use candle::*;
pub use indicator::*;
pub use signal::*;
pub use regime::*;
pub use closed_trade::*;
