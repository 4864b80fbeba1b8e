//! Validation utilities

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Validate that an amount is strictly positive
pub fn validate_positive_amount(field: &'static str, amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::validation(field, "Amount must be positive"))
    } else {
        Ok(())
    }
}

/// Validate that an amount is zero or positive
pub fn validate_non_negative(field: &'static str, amount: &BigDecimal) -> LedgerResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(LedgerError::validation(field, "Amount cannot be negative"))
    } else {
        Ok(())
    }
}

/// Amounts are stored as decimal(18,2)
pub fn validate_amount_scale(field: &'static str, amount: &BigDecimal) -> LedgerResult<()> {
    if amount.round(2) != *amount {
        return Err(LedgerError::validation(
            field,
            format!("Amount {} has more than 2 decimal places", amount),
        ));
    }
    Ok(())
}

/// Validate an account code (digits, letters, dots and dashes)
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(LedgerError::validation("code", "Account code cannot be empty"));
    }

    if code.len() > 20 {
        return Err(LedgerError::validation(
            "code",
            "Account code cannot exceed 20 characters",
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(LedgerError::validation(
            "code",
            "Account code can only contain letters, digits, dots and dashes",
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::validation("name", "Account name cannot be empty"));
    }

    if name.len() > 100 {
        return Err(LedgerError::validation(
            "name",
            "Account name cannot exceed 100 characters",
        ));
    }

    Ok(())
}

/// Validate a voucher number
pub fn validate_voucher_no(voucher_no: &str) -> LedgerResult<()> {
    let voucher_no = voucher_no.trim();
    if voucher_no.is_empty() {
        return Err(LedgerError::validation(
            "voucher_no",
            "Voucher number cannot be empty",
        ));
    }

    if voucher_no.len() > 50 {
        return Err(LedgerError::validation(
            "voucher_no",
            "Voucher number cannot exceed 50 characters",
        ));
    }

    Ok(())
}

/// Validate a voucher narration
pub fn validate_narration(narration: &str) -> LedgerResult<()> {
    if narration.len() > 500 {
        return Err(LedgerError::validation(
            "narration",
            "Narration cannot exceed 500 characters",
        ));
    }

    Ok(())
}

/// Validate a fiscal code (years)
pub fn validate_fiscal_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::validation("code", "Code cannot be empty"));
    }
    Ok(())
}

/// Validate an inclusive date range
pub fn validate_date_range(
    field: &'static str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<()> {
    if end < start {
        return Err(LedgerError::invalid_range(
            field,
            format!("end date {} is before start date {}", end, start),
        ));
    }
    Ok(())
}
