pub mod decision;
pub mod ipo;
pub mod order;
pub mod run_log;

pub use decision::*;
pub use ipo::*;
pub use order::*;
pub use run_log::*;
