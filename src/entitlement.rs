//! Access rules for the free tier and the premium unlock.
//!
//! Two deliberate product rules live here and nowhere else:
//! - free content is unlimited: the free-question counter never locks a
//!   non-premium item, it only decides when a premium tap shows the paywall;
//! - premium access is exactly the unlock flag, nothing else grants it.
//!
//! The counter itself is server-authoritative (dashboard totals). The client
//! never increments it; the legacy on-disk value is only a display fallback
//! until the first dashboard fetch lands.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::{DashboardTotals, SubscriptionRecord};
use crate::storage::LegacyProgress;

/// Items a free-tier account may consume before the paywall engages.
pub const FREE_QUESTION_LIMIT: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementState {
    pub has_unlocked: bool,
    pub free_questions_used: u32,
    pub free_question_limit: u32,
}

impl Default for EntitlementState {
    fn default() -> Self {
        Self::with_limit(FREE_QUESTION_LIMIT)
    }
}

impl EntitlementState {
    /// Fresh state with a configured allowance. The limit is display-side
    /// only until the dashboard reports the server's value.
    pub fn with_limit(free_question_limit: u32) -> Self {
        Self {
            has_unlocked: false,
            free_questions_used: 0,
            free_question_limit,
        }
    }

    /// Authoritative values from the server dashboard.
    pub fn from_dashboard(totals: &DashboardTotals, has_unlocked: bool) -> Self {
        Self {
            has_unlocked,
            free_questions_used: totals.free_questions_used,
            free_question_limit: totals.free_question_limit,
        }
    }

    /// Migration fallback from the pre-server progress blob. Display-only
    /// seed; the next dashboard fetch overwrites it.
    pub fn from_legacy(progress: &LegacyProgress, free_question_limit: u32) -> Self {
        Self {
            has_unlocked: progress.has_unlocked,
            free_questions_used: progress.free_questions_used,
            free_question_limit,
        }
    }

    pub fn apply_subscription(&mut self, record: &SubscriptionRecord) {
        self.has_unlocked = record.is_premium_active();
    }
}

/// Free items are always accessible; premium items require the unlock.
pub fn can_access(is_premium: bool, has_unlocked: bool) -> bool {
    !is_premium || has_unlocked
}

/// The paywall triggers only for premium items, only without the unlock, and
/// only once the free allowance is exhausted.
pub fn should_show_paywall(is_premium: bool, state: &EntitlementState) -> bool {
    is_premium && !state.has_unlocked && state.free_questions_used >= state.free_question_limit
}

/// Where the caller should route a tap on a catalog item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    /// Render the content view.
    Allowed,
    /// Open the paywall/upsell modal.
    ShowPaywall,
    /// Open the login prompt; protected content needs a session first.
    RequireLogin,
}

/// Three-way routing decision for a tap on an item.
pub fn evaluate(logged_in: bool, is_premium: bool, state: &EntitlementState) -> AccessDecision {
    let decision = if !logged_in {
        AccessDecision::RequireLogin
    } else if can_access(is_premium, state.has_unlocked) {
        AccessDecision::Allowed
    } else {
        AccessDecision::ShowPaywall
    };
    debug!(
        target: "entitlement",
        logged_in,
        is_premium,
        has_unlocked = state.has_unlocked,
        free_used = state.free_questions_used,
        ?decision,
        "Access evaluated"
    );
    decision
}
