//! Daily API budget tracking.
//!
//! The upstream plan allows a fixed number of calls per UTC day (each page
//! request is one call). The budget is split between scheduled harvests and
//! on-demand searches so an eager trader cannot starve the background
//! refresh, and vice versa.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use tracing::info;

use super::token::PlanConstraints;

/// Which sub-budget an upstream call draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Harvest,
    Search,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Harvest => write!(f, "harvest"),
            CallKind::Search => write!(f, "search"),
        }
    }
}

/// Default daily call allowance.
pub const DAILY_LIMIT: u32 = 100;
/// Calls reserved for scheduled harvests.
pub const HARVEST_BUDGET: u32 = 60;
/// Calls reserved for on-demand searches.
pub const SEARCH_BUDGET: u32 = 40;

const DEFAULT_CREDITS_ALLOTTED: u64 = 3_000_000;

#[derive(Debug)]
struct Counters {
    day_key: NaiveDate,
    total: u32,
    harvest: u32,
    search: u32,
    credits_consumed: u64,
    credits_allotted: u64,
}

/// Process-singleton budget tracker. Construct once at bootstrap and share
/// by `Arc`; every mutation happens under the internal mutex.
#[derive(Debug)]
pub struct BudgetTracker {
    inner: Mutex<Counters>,
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters {
                day_key: Utc::now().date_naive(),
                total: 0,
                harvest: 0,
                search: 0,
                credits_consumed: 0,
                credits_allotted: DEFAULT_CREDITS_ALLOTTED,
            }),
        }
    }

    fn with_counters<T>(&self, f: impl FnOnce(&mut Counters) -> T) -> T {
        let mut counters = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::maybe_reset(&mut counters, Utc::now().date_naive());
        f(&mut counters)
    }

    fn maybe_reset(counters: &mut Counters, today: NaiveDate) {
        if counters.day_key != today {
            info!(
                day = %today,
                yesterday_calls = counters.total,
                "New UTC day, resetting API budget"
            );
            counters.total = 0;
            counters.harvest = 0;
            counters.search = 0;
            counters.day_key = today;
        }
    }

    /// Record one upstream call against the given sub-budget.
    pub fn record_call(&self, kind: CallKind) {
        self.with_counters(|c| {
            c.total += 1;
            match kind {
                CallKind::Harvest => c.harvest += 1,
                CallKind::Search => c.search += 1,
            }
        });
    }

    /// Whether the harvest sub-budget still has headroom.
    pub fn can_harvest(&self) -> bool {
        self.with_counters(|c| c.harvest < HARVEST_BUDGET)
    }

    /// Whether the on-demand search sub-budget still has headroom.
    pub fn can_search(&self) -> bool {
        self.with_counters(|c| c.search < SEARCH_BUDGET)
    }

    /// Synchronize with the authoritative counters carried in the token
    /// payload. Remote counts only ever raise the local ones.
    pub fn update_from_token(&self, constraints: &PlanConstraints) {
        self.with_counters(|c| {
            if let Some(credits) = &constraints.credit_points {
                c.credits_consumed = credits.total_consumed_credits.unwrap_or(c.credits_consumed);
                c.credits_allotted = credits
                    .total_alloted_credits
                    .unwrap_or(DEFAULT_CREDITS_ALLOTTED);
            }
            if let Some(daily) = &constraints.daily_limit_api {
                if let Some(consumed) = daily.consumed_daily_limit_api {
                    if consumed > c.total {
                        c.total = consumed;
                    }
                }
            }
        });
    }

    /// Snapshot for the dispatch surface.
    pub fn status(&self) -> BudgetStatus {
        self.with_counters(|c| BudgetStatus {
            daily_calls_used: c.total,
            daily_calls_limit: DAILY_LIMIT,
            daily_calls_remaining: DAILY_LIMIT.saturating_sub(c.total),
            harvest_calls_used: c.harvest,
            harvest_budget: HARVEST_BUDGET,
            search_calls_used: c.search,
            search_budget: SEARCH_BUDGET,
            credits_consumed: c.credits_consumed,
            credits_remaining: c.credits_allotted.saturating_sub(c.credits_consumed),
            day: c.day_key,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub daily_calls_used: u32,
    pub daily_calls_limit: u32,
    pub daily_calls_remaining: u32,
    pub harvest_calls_used: u32,
    pub harvest_budget: u32,
    pub search_calls_used: u32,
    pub search_budget: u32,
    pub credits_consumed: u64,
    pub credits_remaining: u64,
    pub day: NaiveDate,
}
