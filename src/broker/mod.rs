pub mod kite;
pub mod session;
pub mod symbols;
mod traits;

pub use kite::KiteClient;
pub use session::{BrokerSessionProvider, FixedBrokerSession, KiteSessionProvider, NoBrokerSession};
pub use symbols::SymbolResolver;
pub use traits::BrokerClient;

#[cfg(test)]
pub use traits::MockBrokerClient;
