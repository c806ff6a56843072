pub mod item;
pub mod ledger;
pub mod registry;
pub mod session;
pub mod config;

pub use item::*;
pub use ledger::*;
pub use registry::*;
pub use session::*;
pub use config::*;
