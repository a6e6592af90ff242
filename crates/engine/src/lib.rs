pub mod binance;
pub mod controller;
pub mod executor;
pub mod state;

pub use binance::BinanceClient;
pub use controller::BotController;
pub use executor::TradeExecutor;
pub use state::{BotState, SharedState};
