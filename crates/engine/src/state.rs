use std::sync::Arc;

use tokio::sync::RwLock;

use common::{Balances, Signal, Trade};

/// Mutable bot state shared between the controller, the poll loop, and the
/// HTTP surface.
///
/// Written only from the poll-loop task (single writer). Readers take
/// advisory snapshots and may observe a state mid-update; the separate
/// running flag lives on the controller.
#[derive(Debug, Default)]
pub struct BotState {
    pub last_signal: Option<Signal>,
    pub balances: Balances,
    pub trades: Vec<Trade>,
}

pub type SharedState = Arc<RwLock<BotState>>;
