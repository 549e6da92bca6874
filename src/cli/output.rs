//! Report formatting for `ipos`, `decisions` and `logs`.
//!
//! Human-readable tables by default, JSON with `--json`.

use chrono::NaiveDate;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::domain::{Decision, Ipo, RunLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct DecisionRow {
    pub id: i64,
    pub company: String,
    pub verdict: String,
    pub status: String,
    pub qty: String,
    pub entry: String,
    pub stop_loss: String,
    pub target: String,
    pub order_id: String,
    pub justification: String,
    pub note: String,
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl From<&Decision> for DecisionRow {
    fn from(d: &Decision) -> Self {
        Self {
            id: d.id,
            company: d.company.clone(),
            verdict: d.verdict.to_string(),
            status: d.status.to_string(),
            qty: or_dash(d.quantity),
            entry: or_dash(d.entry_price),
            stop_loss: or_dash(d.stop_loss_price),
            target: or_dash(d.target_price),
            order_id: or_dash(d.order_id.as_deref()),
            justification: d.justification.clone(),
            note: or_dash(d.note.as_deref()),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct IpoRow {
    pub company: String,
    pub symbol: String,
    /// What happens to the IPO on the report date
    pub event: String,
    pub open: String,
    pub close: String,
    pub listing: String,
    pub issue_price: String,
}

impl IpoRow {
    pub fn on_date(ipo: &Ipo, date: NaiveDate) -> Self {
        let events: Vec<&str> = [
            (ipo.open_date, "opens"),
            (ipo.close_date, "closes"),
            (ipo.listing_date, "lists"),
        ]
        .iter()
        .filter(|(d, _)| *d == Some(date))
        .map(|(_, event)| *event)
        .collect();

        Self {
            company: ipo.company.clone(),
            symbol: or_dash(ipo.symbol.as_deref()),
            event: events.join(", "),
            open: or_dash(ipo.open_date),
            close: or_dash(ipo.close_date),
            listing: or_dash(ipo.listing_date),
            issue_price: or_dash(ipo.issue_price),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct RunLogRow {
    pub time: String,
    pub kind: String,
    pub status: String,
    pub details: String,
}

impl From<&RunLog> for RunLogRow {
    fn from(log: &RunLog) -> Self {
        Self {
            time: log.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: log.kind.to_string(),
            status: log.status.to_string(),
            details: log.details.clone(),
        }
    }
}

/// Print rows in the chosen mode
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecisionStatus, Verdict};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn decision_row_dashes_missing_fields() {
        let now = Utc::now();
        let decision = Decision {
            id: 7,
            date: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            company: "Alpha Co".to_string(),
            verdict: Verdict::Buy,
            justification: "All categories oversubscribed".to_string(),
            status: DecisionStatus::Executed,
            order_id: Some("E1".to_string()),
            stop_loss_order_id: None,
            target_order_id: None,
            entry_price: Some(dec!(102.37)),
            stop_loss_price: Some(dec!(100.83)),
            target_price: Some(dec!(106.46)),
            quantity: Some(50),
            note: None,
            created_at: now,
            updated_at: now,
        };

        let row = DecisionRow::from(&decision);
        assert_eq!(row.verdict, "BUY");
        assert_eq!(row.status, "EXECUTED");
        assert_eq!(row.qty, "50");
        assert_eq!(row.entry, "102.37");
        assert_eq!(row.note, "-");
    }

    #[test]
    fn ipo_row_names_the_day_events() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 4).unwrap();
        let mut ipo = Ipo::new("Alpha Co");
        ipo.open_date = NaiveDate::from_ymd_opt(2026, 2, 2);
        ipo.close_date = Some(day);
        ipo.issue_price = Some(dec!(100));

        let row = IpoRow::on_date(&ipo, day);
        assert_eq!(row.event, "closes");
        assert_eq!(row.open, "2026-02-02");
        assert_eq!(row.listing, "-");
        assert_eq!(row.symbol, "-");
        assert_eq!(row.issue_price, "100");
    }
}
