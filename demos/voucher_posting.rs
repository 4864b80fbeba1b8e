//! Voucher posting walkthrough: standard chart, a monthly fiscal year, a few
//! vouchers and the reports they produce.
//!
//! Run with `RUST_LOG=cooperative_ledger=debug` to see the posting trace.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use cooperative_ledger::ledger::account::utils::create_standard_chart;
use cooperative_ledger::ledger::fiscal::utils::create_monthly_year;
use cooperative_ledger::utils::MemoryStorage;
use cooperative_ledger::{
    patterns, JournalRow, Ledger, LedgerConfig, ReportFilter, SubledgerKind, VoucherBuilder,
    VoucherType,
};
use tracing_subscriber::EnvFilter;

fn day(y: i32, m: u32, d: u32) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| format!("invalid date {y}-{m}-{d}").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LedgerConfig::load(std::env::var("LEDGER_CONFIG").ok().as_deref())?;
    let ledger = Ledger::with_config(MemoryStorage::new(), config);

    println!("Setting up chart of accounts...");
    let chart = create_standard_chart(ledger.chart()).await?;
    let tree = ledger.account_tree().await?;
    for entry in tree.render() {
        println!(
            "  {}{} {}",
            "  ".repeat(entry.depth),
            entry.account.code,
            entry.account.name
        );
    }

    let (year, periods) =
        create_monthly_year(ledger.calendar(), "FY2024-25", day(2024, 7, 1)?, day(2025, 6, 30)?)
            .await?;
    ledger.activate_fiscal_year(year.id).await?;
    println!("\nFiscal year {} with {} periods", year.code, periods.len());

    let (july, august) = (periods[0].id, periods[1].id);
    let id = |code: &str| chart.get(code).map(|a| a.id).ok_or(format!("missing account {code}"));

    let drafts = vec![
        patterns::receipt("RV-0001", day(2024, 7, 1)?, july, id("3100")?, id("1111")?, BigDecimal::from(50000))?,
        patterns::transfer("CV-0001", day(2024, 7, 2)?, july, id("1111")?, id("1112")?, BigDecimal::from(30000))?,
        VoucherBuilder::new("JV-0001", VoucherType::Journal, day(2024, 7, 10)?, july)
            .narration("Loan disbursement to member 42")
            .row(
                JournalRow::debit(id("1200")?, BigDecimal::from(20000))
                    .with_subledger(SubledgerKind::LoanAccount, 42),
            )
            .credit(id("1112")?, BigDecimal::from(20000))
            .build()?,
        patterns::payment("PV-0001", day(2024, 7, 31)?, july, id("5020")?, id("1111")?, BigDecimal::from(6000))?,
        patterns::receipt("RV-0002", day(2024, 8, 5)?, august, id("4100")?, id("1111")?, BigDecimal::from(1800))?,
    ];

    println!("\nPosting vouchers...");
    for draft in drafts {
        let voucher = ledger.post_voucher(draft).await?;
        println!(
            "  {} {:?} {} [{}]",
            voucher.voucher_no,
            voucher.voucher_type,
            voucher.total_debits(),
            voucher.status
        );
    }

    ledger.close_period(july).await?;
    println!("\nClosed period {}", periods[0].period_name);

    let filter = ReportFilter::for_year(year.id);

    let trial_balance = ledger.trial_balance(&filter).await?;
    println!("\nTrial balance");
    for row in trial_balance.rows.iter().filter(|r| r.total_debit != r.total_credit) {
        println!(
            "  {} {:<24} Dr {:>10} Cr {:>10}",
            row.account_code, row.account_name, row.total_debit, row.total_credit
        );
    }
    println!(
        "  Totals Dr {} Cr {} balanced: {}",
        trial_balance.total_debit, trial_balance.total_credit, trial_balance.is_balanced
    );

    let pnl = ledger.profit_and_loss(&filter).await?;
    println!(
        "\nIncome {} Expense {} Net {}",
        pnl.total_income, pnl.total_expense, pnl.net_profit
    );

    for section in ledger.balance_sheet(&filter).await?.sections {
        println!(
            "\nBalance sheet {} as of {}: assets {} = liabilities {} + equity {} + earnings {} ({})",
            section.fiscal_year_code,
            section.as_of,
            section.total_assets,
            section.total_liabilities,
            section.total_equity,
            &section.retained_earnings + &section.current_earnings,
            if section.is_balanced { "balanced" } else { "NOT balanced" }
        );
    }

    println!("\nCash flow");
    for row in ledger
        .cash_flow(&filter)
        .await?
        .rows
        .iter()
        .filter(|r| r.inflow != r.outflow)
    {
        println!(
            "  {} opening {} in {} out {} closing {}",
            row.period_name, row.opening_cash, row.inflow, row.outflow, row.closing_cash
        );
    }

    let integrity = ledger.validate_integrity().await?;
    println!("\nIntegrity check clean: {}", integrity.is_clean());

    Ok(())
}
