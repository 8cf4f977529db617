mod transaction;
mod trade;
mod slippage;
mod protection;

pub use transaction::*;
pub use trade::*;
pub use slippage::*;
pub use protection::*;
