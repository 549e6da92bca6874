use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An IPO as tracked by the store, keyed by company name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ipo {
    pub company: String,
    /// Exchange symbol reported by the market-data source, when known
    pub symbol: Option<String>,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub listing_date: Option<NaiveDate>,
    /// Upper end of the price band; unknown until a later scrape or manual entry
    pub issue_price: Option<Decimal>,
}

impl Ipo {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            symbol: None,
            open_date: None,
            close_date: None,
            listing_date: None,
            issue_price: None,
        }
    }

    /// Merge a refreshed record over this one.
    ///
    /// Known values are never replaced by unknown ones, so a scrape that lacks
    /// listing data does not erase what was entered earlier.
    pub fn merge(&mut self, fresh: &Ipo) {
        if fresh.symbol.is_some() {
            self.symbol = fresh.symbol.clone();
        }
        if fresh.open_date.is_some() {
            self.open_date = fresh.open_date;
        }
        if fresh.close_date.is_some() {
            self.close_date = fresh.close_date;
        }
        if fresh.listing_date.is_some() {
            self.listing_date = fresh.listing_date;
        }
        if fresh.issue_price.is_some() {
            self.issue_price = fresh.issue_price;
        }
    }
}

/// The five investor classes used for IPO allocation, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidCategory {
    /// Qualified institutional buyers
    Qib,
    /// Non-institutional, bids above Rs 10 lakh
    Snii,
    /// Non-institutional, bids below Rs 10 lakh
    Bnii,
    /// Non-institutional aggregate
    Nii,
    Retail,
}

impl BidCategory {
    pub const ALL: [BidCategory; 5] = [
        BidCategory::Qib,
        BidCategory::Snii,
        BidCategory::Bnii,
        BidCategory::Nii,
        BidCategory::Retail,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BidCategory::Qib => "QIB",
            BidCategory::Snii => "SNII",
            BidCategory::Bnii => "BNII",
            BidCategory::Nii => "NII",
            BidCategory::Retail => "Retail",
        }
    }
}

impl fmt::Display for BidCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Per-category oversubscription multiples as reported by the exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDetail {
    #[serde(default)]
    pub qib: Decimal,
    #[serde(default)]
    pub nii: Decimal,
    #[serde(default)]
    pub snii: Decimal,
    #[serde(default)]
    pub bnii: Decimal,
    #[serde(default)]
    pub retail: Decimal,
}

impl SubscriptionDetail {
    pub fn get(&self, category: BidCategory) -> Decimal {
        match category {
            BidCategory::Qib => self.qib,
            BidCategory::Snii => self.snii,
            BidCategory::Bnii => self.bnii,
            BidCategory::Nii => self.nii,
            BidCategory::Retail => self.retail,
        }
    }

    pub fn set(&mut self, category: BidCategory, multiple: Decimal) {
        let multiple = multiple.max(Decimal::ZERO);
        match category {
            BidCategory::Qib => self.qib = multiple,
            BidCategory::Snii => self.snii = multiple,
            BidCategory::Bnii => self.bnii = multiple,
            BidCategory::Nii => self.nii = multiple,
            BidCategory::Retail => self.retail = multiple,
        }
    }

    /// Build from optional figures; absent or negative values become zero
    pub fn from_optional(
        qib: Option<Decimal>,
        nii: Option<Decimal>,
        snii: Option<Decimal>,
        bnii: Option<Decimal>,
        retail: Option<Decimal>,
    ) -> Self {
        let mut detail = Self::default();
        detail.set(BidCategory::Qib, qib.unwrap_or_default());
        detail.set(BidCategory::Nii, nii.unwrap_or_default());
        detail.set(BidCategory::Snii, snii.unwrap_or_default());
        detail.set(BidCategory::Bnii, bnii.unwrap_or_default());
        detail.set(BidCategory::Retail, retail.unwrap_or_default());
        detail
    }
}

/// Subscription figures for one IPO as of its close date.
///
/// Written once per (company, close_date); the first snapshot wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub company: String,
    pub close_date: NaiveDate,
    pub multiples: SubscriptionDetail,
}

impl SubscriptionSnapshot {
    pub fn new(company: impl Into<String>, close_date: NaiveDate, multiples: SubscriptionDetail) -> Self {
        Self {
            company: company.into(),
            close_date,
            multiples,
        }
    }
}

/// One row of the current-issues listing from the market-data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpoListing {
    pub company: String,
    pub symbol: String,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub issue_price: Option<Decimal>,
    /// Overall subscription multiple, informational only
    pub subscription_multiple: Decimal,
}

impl IpoListing {
    pub fn to_ipo(&self) -> Ipo {
        Ipo {
            company: self.company.clone(),
            symbol: (!self.symbol.is_empty()).then(|| self.symbol.clone()),
            open_date: self.open_date,
            close_date: self.close_date,
            listing_date: None,
            issue_price: self.issue_price,
        }
    }

    /// e.g. `Alpha Co (ALPHACO): 4.52x subscribed`
    pub fn summary(&self) -> String {
        let name = if self.symbol.is_empty() {
            self.company.clone()
        } else {
            format!("{} ({})", self.company, self.symbol)
        };
        format!("{}: {}x subscribed", name, self.subscription_multiple.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_multiples_clamped_to_zero() {
        let detail = SubscriptionDetail::from_optional(
            Some(dec!(-1.5)),
            None,
            Some(dec!(2)),
            None,
            Some(dec!(0.4)),
        );
        assert_eq!(detail.qib, Decimal::ZERO);
        assert_eq!(detail.nii, Decimal::ZERO);
        assert_eq!(detail.snii, dec!(2));
        assert_eq!(detail.retail, dec!(0.4));
    }

    #[test]
    fn test_merge_keeps_known_listing_data() {
        let mut stored = Ipo::new("Alpha Co");
        stored.listing_date = NaiveDate::from_ymd_opt(2026, 2, 9);
        stored.issue_price = Some(dec!(100));

        let mut fresh = Ipo::new("Alpha Co");
        fresh.close_date = NaiveDate::from_ymd_opt(2026, 2, 4);
        stored.merge(&fresh);

        assert_eq!(stored.listing_date, NaiveDate::from_ymd_opt(2026, 2, 9));
        assert_eq!(stored.issue_price, Some(dec!(100)));
        assert_eq!(stored.close_date, NaiveDate::from_ymd_opt(2026, 2, 4));
    }

    #[test]
    fn test_listing_summary_shows_multiple() {
        let listing = IpoListing {
            company: "Alpha Co".to_string(),
            symbol: "ALPHACO".to_string(),
            open_date: None,
            close_date: None,
            issue_price: None,
            subscription_multiple: dec!(4.520),
        };
        assert_eq!(listing.summary(), "Alpha Co (ALPHACO): 4.52x subscribed");

        let unlisted = IpoListing {
            symbol: String::new(),
            subscription_multiple: dec!(3.00),
            ..listing
        };
        assert_eq!(unlisted.summary(), "Alpha Co: 3x subscribed");
    }
}
