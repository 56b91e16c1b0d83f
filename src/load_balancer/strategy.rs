//! Endpoint selection strategies.
//!
//! Each strategy is a pure function over the cluster's endpoint map and its
//! sticky target: it yields the ordered keys to probe, and the sticky target
//! to keep once one of them answered. Probing and eviction stay in the cluster.
//!
//! ```text
//! Sticky mode:    current set?   ── yes ─▶ Sticky ──(dead)──▶ Fallback
//!                                └─ no ──────────────────────▶ Fallback
//! Balanced mode:  Balanced
//! ```

use std::collections::BTreeMap;

/// Gateway-wide routing mode, chosen by the `balance` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Keep serving through the last good endpoint.
    #[default]
    Sticky,
    /// Probe and pick among all endpoints on every request.
    Balanced,
}

impl RoutingMode {
    pub fn from_balance_flag(balance: bool) -> Self {
        if balance {
            RoutingMode::Balanced
        } else {
            RoutingMode::Sticky
        }
    }

    /// Strategies to run, in order, until one yields a healthy endpoint.
    pub fn plan(self, has_current: bool) -> &'static [Strategy] {
        match (self, has_current) {
            (RoutingMode::Balanced, _) => &[Strategy::Balanced],
            (RoutingMode::Sticky, true) => &[Strategy::Sticky, Strategy::Fallback],
            (RoutingMode::Sticky, false) => &[Strategy::Fallback],
        }
    }
}

/// A named selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Only the current sticky target.
    Sticky,
    /// Every endpoint in key order; the first healthy one becomes sticky.
    Fallback,
    /// Every endpoint in key order, rotated by the cluster cursor.
    Balanced,
}

impl Strategy {
    /// Ordered keys to probe.
    pub fn candidates<V>(
        self,
        endpoints: &BTreeMap<String, V>,
        current: Option<&str>,
        cursor: usize,
    ) -> Vec<String> {
        match self {
            Strategy::Sticky => current
                .filter(|key| endpoints.contains_key(*key))
                .map(|key| vec![key.to_string()])
                .unwrap_or_default(),
            Strategy::Fallback => endpoints.keys().cloned().collect(),
            Strategy::Balanced => {
                let mut keys: Vec<String> = endpoints.keys().cloned().collect();
                if !keys.is_empty() {
                    let len = keys.len();
                    keys.rotate_left(cursor % len);
                }
                keys
            }
        }
    }

    /// Sticky target after `chosen` served the request.
    pub fn next_current(self, chosen: &str, current: Option<&str>) -> Option<String> {
        match self {
            Strategy::Sticky | Strategy::Fallback => Some(chosen.to_string()),
            Strategy::Balanced => current.map(str::to_string),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Sticky => "sticky",
            Strategy::Fallback => "fallback",
            Strategy::Balanced => "balanced",
        }
    }
}
