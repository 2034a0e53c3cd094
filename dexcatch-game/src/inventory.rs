//! Ball inventory and the lifetime first-capture counter.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ball::BallKind;
use crate::config::{CatchConfig, StartingStock};
use crate::constants::UNLIMITED_SENTINEL;

/// Stock level of a single ball kind.
///
/// Persisted as an integer where [`UNLIMITED_SENTINEL`] marks unlimited supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Stock {
    Unlimited,
    Count(u32),
}

impl Stock {
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Count(n) => n > 0,
        }
    }

    #[must_use]
    pub const fn count(self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Count(n) => Some(n),
        }
    }
}

impl From<i64> for Stock {
    fn from(raw: i64) -> Self {
        if raw == UNLIMITED_SENTINEL {
            return Self::Unlimited;
        }
        Self::Count(u32::try_from(raw.max(0)).unwrap_or(u32::MAX))
    }
}

impl From<Stock> for i64 {
    fn from(stock: Stock) -> Self {
        match stock {
            Stock::Unlimited => UNLIMITED_SENTINEL,
            Stock::Count(n) => Self::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no {0} left")]
pub struct OutOfStock(pub BallKind);

/// A bonus ball handed out when a capture milestone is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusGrant {
    pub ball: BallKind,
    pub amount: u32,
    /// The `total_captures` value that triggered the grant.
    pub milestone: u32,
}

/// Ball counts plus the number of distinct creatures ever captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    counts: BTreeMap<BallKind, Stock>,
    #[serde(default)]
    total_captures: u32,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::starting(&StartingStock::default())
    }
}

impl Inventory {
    /// Fresh inventory: unlimited default balls plus the configured finite stock.
    #[must_use]
    pub fn starting(stock: &StartingStock) -> Self {
        let mut counts = BTreeMap::new();
        counts.insert(BallKind::Poke, Stock::Unlimited);
        counts.insert(BallKind::Great, Stock::Count(stock.great));
        counts.insert(BallKind::Ultra, Stock::Count(stock.ultra));
        Self {
            counts,
            total_captures: 0,
        }
    }

    /// Current stock for `ball`. Kinds missing from persisted data read as empty,
    /// except the default ball which is always unlimited.
    #[must_use]
    pub fn stock(&self, ball: BallKind) -> Stock {
        self.counts.get(&ball).copied().unwrap_or(if ball.is_default() {
            Stock::Unlimited
        } else {
            Stock::Count(0)
        })
    }

    #[must_use]
    pub fn is_available(&self, ball: BallKind) -> bool {
        self.stock(ball).is_available()
    }

    #[must_use]
    pub const fn total_captures(&self) -> u32 {
        self.total_captures
    }

    pub fn set_stock(&mut self, ball: BallKind, stock: Stock) {
        self.counts.insert(ball, stock);
    }

    /// Take one ball. Unlimited stock is never decremented.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfStock`] without touching the count when none are left.
    pub fn try_consume(&mut self, ball: BallKind) -> Result<Stock, OutOfStock> {
        match self.stock(ball) {
            Stock::Unlimited => Ok(Stock::Unlimited),
            Stock::Count(0) => Err(OutOfStock(ball)),
            Stock::Count(n) => {
                let remaining = Stock::Count(n - 1);
                self.counts.insert(ball, remaining);
                Ok(remaining)
            }
        }
    }

    pub fn grant(&mut self, ball: BallKind, amount: u32) {
        if let Stock::Count(n) = self.stock(ball) {
            self.counts.insert(ball, Stock::Count(n.saturating_add(amount)));
        }
    }

    /// Count a first-ever capture and hand out any milestone bonuses. A zero
    /// cadence disables that bonus.
    pub fn record_first_capture(&mut self, config: &CatchConfig) -> Vec<BonusGrant> {
        self.total_captures = self.total_captures.saturating_add(1);
        let total = self.total_captures;
        let mut grants = Vec::new();
        if total.checked_rem(config.great_bonus_every) == Some(0) {
            grants.push(BonusGrant {
                ball: BallKind::Great,
                amount: 1,
                milestone: total,
            });
        }
        if total.checked_rem(config.ultra_bonus_every) == Some(0) {
            grants.push(BonusGrant {
                ball: BallKind::Ultra,
                amount: 1,
                milestone: total,
            });
        }
        for grant in &grants {
            self.grant(grant.ball, grant.amount);
        }
        grants
    }

    /// Snapshot of every kind's stock in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(BallKind, Stock)> {
        BallKind::ALL
            .iter()
            .map(|&ball| (ball, self.stock(ball)))
            .collect()
    }
}
