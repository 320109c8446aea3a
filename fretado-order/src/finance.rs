use chrono::NaiveDate;
use fretado_core::ValidationError;
use fretado_shared::{Order, PaymentRecord};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A payment record as typed into the form, before parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecordDraft {
    pub date: String,
    pub amount: String,
    pub method: String,
}

impl PaymentRecordDraft {
    pub fn new(date: impl Into<String>, amount: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            amount: amount.into(),
            method: method.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Order total must not be negative")]
    NegativeTotal,

    #[error("Order total {0} is not a valid amount")]
    InvalidTotal(Decimal),

    #[error("Payments of {paid} exceed the order total of {total}")]
    PaymentExceedsTotal { total: Decimal, paid: Decimal },

    #[error("Payment record {index} has an invalid {field}")]
    InvalidRecord { index: usize, field: &'static str },

    #[error("Payment record {0} does not exist")]
    NoSuchRecord(usize),
}

impl From<LedgerError> for ValidationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NegativeTotal => ValidationError::NegativeTotal,
            LedgerError::InvalidTotal(total) => ValidationError::InvalidTotal { total },
            LedgerError::PaymentExceedsTotal { total, paid } => {
                ValidationError::PaymentExceedsTotal { total, paid }
            }
            LedgerError::InvalidRecord { index, field } => {
                ValidationError::InvalidPaymentRecord { index, field }
            }
            LedgerError::NoSuchRecord(index) => ValidationError::InvalidPaymentRecord {
                index,
                field: "index",
            },
        }
    }
}

impl From<LedgerError> for fretado_core::CoreError {
    fn from(err: LedgerError) -> Self {
        fretado_core::CoreError::Validation(err.into())
    }
}

/// Paid/remaining view of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

/// Reads a money amount typed with either `.` or `,` as decimal separator.
///
/// When both appear, the last one is the decimal separator and the other is a
/// thousands separator ("1.234,56" and "1,234.56" both read 1234.56).
/// Blank or unreadable input counts as zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Largest total or single payment the ledger accepts
pub fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000, 0)
}

/// Within `0..=max_amount()` and with no more than `scale` decimal places
fn is_valid_amount(amount: Decimal, scale: u32) -> bool {
    amount >= Decimal::ZERO && amount <= max_amount() && amount.normalize().scale() <= scale
}

/// Accepts ISO dates and the day-first form used on receipts
pub fn parse_payment_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

/// Accumulates payment records against an order total
pub struct PaymentLedger;

impl PaymentLedger {
    /// Sum of the records. Saturates at `Decimal::MAX`, so an overflowing sum
    /// reads as more than any total.
    pub fn paid(records: &[PaymentRecord]) -> Decimal {
        records
            .iter()
            .try_fold(Decimal::ZERO, |sum, r| sum.checked_add(r.amount))
            .unwrap_or(Decimal::MAX)
    }

    /// `total - paid`, rounded half-up to `scale` places for display
    pub fn remaining(total: Decimal, paid: Decimal, scale: u32) -> Decimal {
        total
            .checked_sub(paid)
            .unwrap_or(Decimal::MIN)
            .round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn summary(order: &Order, scale: u32) -> LedgerSummary {
        let paid = Self::paid(&order.payment_records);
        LedgerSummary {
            total: order.payer.total,
            paid,
            remaining: Self::remaining(order.payer.total, paid, scale),
        }
    }

    /// Parse the payer total typed on the form
    pub fn parse_total(raw: &str, scale: u32) -> Result<Decimal, LedgerError> {
        let total = parse_amount(raw);
        if total < Decimal::ZERO {
            return Err(LedgerError::NegativeTotal);
        }
        if !is_valid_amount(total, scale) {
            return Err(LedgerError::InvalidTotal(total));
        }
        Ok(total)
    }

    /// A record needs a date, a strictly positive amount of at most `scale`
    /// decimal places, and a method
    pub fn parse_record(index: usize, draft: &PaymentRecordDraft, scale: u32) -> Result<PaymentRecord, LedgerError> {
        let date = parse_payment_date(&draft.date)
            .ok_or(LedgerError::InvalidRecord { index, field: "date" })?;

        let amount = parse_amount(&draft.amount);
        if amount <= Decimal::ZERO || !is_valid_amount(amount, scale) {
            return Err(LedgerError::InvalidRecord { index, field: "amount" });
        }

        let method = draft.method.trim();
        if method.is_empty() {
            return Err(LedgerError::InvalidRecord { index, field: "method" });
        }

        Ok(PaymentRecord {
            date,
            amount,
            method: method.to_string(),
        })
    }

    /// Parse every draft. One bad record rejects the whole set.
    pub fn parse_records(drafts: &[PaymentRecordDraft], scale: u32) -> Result<Vec<PaymentRecord>, LedgerError> {
        drafts
            .iter()
            .enumerate()
            .map(|(index, draft)| Self::parse_record(index, draft, scale))
            .collect()
    }

    pub fn check_within_total(total: Decimal, records: &[PaymentRecord]) -> Result<(), LedgerError> {
        if total < Decimal::ZERO {
            return Err(LedgerError::NegativeTotal);
        }
        let paid = Self::paid(records);
        if paid > total {
            return Err(LedgerError::PaymentExceedsTotal { total, paid });
        }
        Ok(())
    }

    /// Append a record. On error the order is left untouched.
    pub fn add_record(order: &mut Order, draft: &PaymentRecordDraft, scale: u32) -> Result<LedgerSummary, LedgerError> {
        let record = Self::parse_record(order.payment_records.len(), draft, scale)?;

        let total = order.payer.total;
        let paid = Self::paid(&order.payment_records).checked_add(record.amount);
        match paid {
            Some(paid) if paid <= total => {}
            _ => {
                return Err(LedgerError::PaymentExceedsTotal {
                    total,
                    paid: paid.unwrap_or(Decimal::MAX),
                })
            }
        }

        order.payment_records.push(record);
        Ok(Self::summary(order, scale))
    }

    pub fn remove_record(order: &mut Order, index: usize, scale: u32) -> Result<LedgerSummary, LedgerError> {
        if index >= order.payment_records.len() {
            return Err(LedgerError::NoSuchRecord(index));
        }
        order.payment_records.remove(index);
        Ok(Self::summary(order, scale))
    }
}
