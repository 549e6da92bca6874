use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the subscription rule for one IPO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Skip,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Buy => "BUY",
            Verdict::Skip => "SKIP",
        }
    }

    /// Status a freshly recorded decision with this verdict starts in
    pub fn initial_status(&self) -> DecisionStatus {
        match self {
            Verdict::Buy => DecisionStatus::Pending,
            Verdict::Skip => DecisionStatus::Skipped,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Verdict {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Verdict::Buy),
            "SKIP" => Ok(Verdict::Skip),
            _ => Err(format!("Unknown verdict: {}", s)),
        }
    }
}

/// Decision lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionStatus {
    /// BUY recorded, waiting for listing day
    Pending,
    /// SKIP verdict; terminal from creation
    Skipped,
    /// Entry order placed and bracket orders attempted
    Executed,
    /// No broker session; nothing was sent
    Simulated,
    /// Sizing failed or the entry order was not accepted
    Failed,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Pending => "PENDING",
            DecisionStatus::Skipped => "SKIPPED",
            DecisionStatus::Executed => "EXECUTED",
            DecisionStatus::Simulated => "SIMULATED",
            DecisionStatus::Failed => "FAILED",
        }
    }

    /// Only `Pending` may move, and only into an execution outcome
    pub fn can_transition_to(&self, target: DecisionStatus) -> bool {
        use DecisionStatus::*;

        matches!(
            (self, target),
            (Pending, Executed) | (Pending, Simulated) | (Pending, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecisionStatus::Pending)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for DecisionStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(DecisionStatus::Pending),
            "SKIPPED" => Ok(DecisionStatus::Skipped),
            "EXECUTED" => Ok(DecisionStatus::Executed),
            "SIMULATED" => Ok(DecisionStatus::Simulated),
            "FAILED" => Ok(DecisionStatus::Failed),
            _ => Err(format!("Unknown decision status: {}", s)),
        }
    }
}

/// A recorded BUY/SKIP decision and, for BUYs, its execution outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: i64,
    pub date: NaiveDate,
    pub company: String,
    pub verdict: Verdict,
    pub justification: String,
    pub status: DecisionStatus,
    pub order_id: Option<String>,
    pub stop_loss_order_id: Option<String>,
    pub target_order_id: Option<String>,
    pub entry_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub quantity: Option<u64>,
    /// Why the decision ended where it did (failure reason, approximate fill)
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct NewDecision {
    pub date: NaiveDate,
    pub company: String,
    pub verdict: Verdict,
    pub justification: String,
}

impl NewDecision {
    pub fn new(
        date: NaiveDate,
        company: impl Into<String>,
        verdict: Verdict,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            date,
            company: company.into(),
            verdict,
            justification: justification.into(),
        }
    }
}

/// Terminal update applied once to a pending decision.
///
/// Fields left as `None` are not written.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionUpdate {
    pub status: DecisionStatus,
    pub order_id: Option<String>,
    pub stop_loss_order_id: Option<String>,
    pub target_order_id: Option<String>,
    pub entry_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub quantity: Option<u64>,
    pub note: Option<String>,
}

impl DecisionUpdate {
    pub fn status(status: DecisionStatus) -> Self {
        Self {
            status,
            order_id: None,
            stop_loss_order_id: None,
            target_order_id: None,
            entry_price: None,
            stop_loss_price: None,
            target_price: None,
            quantity: None,
            note: None,
        }
    }

    pub fn simulated() -> Self {
        Self::status(DecisionStatus::Simulated).with_note("no broker session")
    }

    pub fn failed(note: impl Into<String>) -> Self {
        Self::status(DecisionStatus::Failed).with_note(note)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Same order ids, prices and quantity, but `FAILED`, with `reason`
    /// ahead of any existing note
    pub fn into_failed(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.note = Some(match self.note.take() {
            Some(note) => format!("{}; {}", reason, note),
            None => reason,
        });
        self.status = DecisionStatus::Failed;
        self
    }

    /// Apply onto a stored decision; callers check the transition first
    pub fn apply_to(&self, decision: &mut Decision) {
        decision.status = self.status;
        if let Some(ref v) = self.order_id {
            decision.order_id = Some(v.clone());
        }
        if let Some(ref v) = self.stop_loss_order_id {
            decision.stop_loss_order_id = Some(v.clone());
        }
        if let Some(ref v) = self.target_order_id {
            decision.target_order_id = Some(v.clone());
        }
        if self.entry_price.is_some() {
            decision.entry_price = self.entry_price;
        }
        if self.stop_loss_price.is_some() {
            decision.stop_loss_price = self.stop_loss_price;
        }
        if self.target_price.is_some() {
            decision.target_price = self.target_price;
        }
        if self.quantity.is_some() {
            decision.quantity = self.quantity;
        }
        if let Some(ref v) = self.note {
            decision.note = Some(v.clone());
        }
        decision.updated_at = Utc::now();
    }
}

/// A pending BUY joined with its IPO's issue price
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBuy {
    pub decision: Decision,
    pub issue_price: Option<Decimal>,
    pub symbol: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use DecisionStatus::*;

        assert!(Pending.can_transition_to(Executed));
        assert!(Pending.can_transition_to(Simulated));
        assert!(Pending.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Skipped));
        assert!(!Skipped.can_transition_to(Executed));
        assert!(!Executed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Executed));
        assert!(!Simulated.can_transition_to(Executed));
    }

    #[test]
    fn test_into_failed_keeps_order_ids() {
        let mut update = DecisionUpdate::status(DecisionStatus::Executed)
            .with_order_id("E1")
            .with_note("target order failed: rejected");
        update.stop_loss_order_id = Some("SL1".to_string());
        update.quantity = Some(50);

        let failed = update.into_failed("execution error: connection reset");
        assert_eq!(failed.status, DecisionStatus::Failed);
        assert_eq!(failed.order_id.as_deref(), Some("E1"));
        assert_eq!(failed.stop_loss_order_id.as_deref(), Some("SL1"));
        assert_eq!(failed.quantity, Some(50));
        assert_eq!(
            failed.note.as_deref(),
            Some("execution error: connection reset; target order failed: rejected")
        );
    }

    #[test]
    fn test_initial_status_by_verdict() {
        assert_eq!(Verdict::Buy.initial_status(), DecisionStatus::Pending);
        assert_eq!(Verdict::Skip.initial_status(), DecisionStatus::Skipped);
        assert!(Verdict::Skip.initial_status().is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            DecisionStatus::try_from("executed").unwrap(),
            DecisionStatus::Executed
        );
        assert_eq!(Verdict::try_from("BUY").unwrap(), Verdict::Buy);
        assert!(DecisionStatus::try_from("DONE").is_err());
    }
}
