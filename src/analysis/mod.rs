//! Ratio arithmetic and per-company summary assembly. Every function is
//! pure; a missing precondition makes that one metric undefined without
//! touching its siblings.

use crate::extractor::{
    extract_amount, extract_amount_containing, CONSOLIDATED, CONSOLIDATED_CASH_FLOW, NET_INCOME,
    OPERATING_ACTIVITIES, OPERATING_PROFIT, REVENUE, TOTAL_EQUITY, TOTAL_LIABILITIES,
};
use crate::models::{CompanyFinancialSummary, QuoteSnapshot, StatementRow, StockRecord};

/// Year-over-year growth in percent. Undefined when the previous value is
/// absent or zero.
pub fn growth_rate(current: Option<i64>, previous: Option<i64>) -> Option<f64> {
    let current = current?;
    let previous = previous?;
    if previous == 0 {
        return None;
    }
    Some((current - previous) as f64 / previous as f64 * 100.0)
}

/// Market capitalization over total equity. Undefined unless equity > 0.
pub fn price_to_book(market_cap: Option<i64>, equity: Option<i64>) -> Option<f64> {
    let market_cap = market_cap?;
    let equity = equity?;
    if equity <= 0 {
        return None;
    }
    Some(market_cap as f64 / equity as f64)
}

/// Market capitalization over net income. Undefined unless net income > 0.
pub fn price_to_earnings(market_cap: Option<i64>, net_income: Option<i64>) -> Option<f64> {
    let market_cap = market_cap?;
    let net_income = net_income?;
    if net_income <= 0 {
        return None;
    }
    Some(market_cap as f64 / net_income as f64)
}

/// Net income over equity, in percent. Undefined unless equity > 0.
pub fn return_on_equity(net_income: Option<i64>, equity: Option<i64>) -> Option<f64> {
    let net_income = net_income?;
    let equity = equity?;
    if equity <= 0 {
        return None;
    }
    Some(net_income as f64 / equity as f64 * 100.0)
}

/// Total liabilities over equity, in percent. Undefined unless equity > 0.
pub fn debt_ratio(liabilities: Option<i64>, equity: Option<i64>) -> Option<f64> {
    let liabilities = liabilities?;
    let equity = equity?;
    if equity <= 0 {
        return None;
    }
    Some(liabilities as f64 / equity as f64 * 100.0)
}

fn round2(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 100.0).round() / 100.0)
}

/// Assemble a company's summary from its two single-account statement
/// tables, the full statement table (cash flow), and a market quote.
/// Any of the inputs may be empty; each derived field degrades to `None`
/// independently.
pub fn build_summary(
    record: &StockRecord,
    current_rows: &[StatementRow],
    previous_rows: &[StatementRow],
    full_rows: &[StatementRow],
    quote: &QuoteSnapshot,
) -> CompanyFinancialSummary {
    let operating_profit = extract_amount(current_rows, OPERATING_PROFIT, CONSOLIDATED);
    let operating_profit_prev = extract_amount(previous_rows, OPERATING_PROFIT, CONSOLIDATED);
    let net_income = extract_amount(current_rows, NET_INCOME, CONSOLIDATED);
    let net_income_prev = extract_amount(previous_rows, NET_INCOME, CONSOLIDATED);
    let revenue = extract_amount(current_rows, REVENUE, CONSOLIDATED);
    let revenue_prev = extract_amount(previous_rows, REVENUE, CONSOLIDATED);
    let equity = extract_amount(current_rows, TOTAL_EQUITY, CONSOLIDATED);
    let total_liabilities = extract_amount(current_rows, TOTAL_LIABILITIES, CONSOLIDATED);
    let operating_cash_flow =
        extract_amount_containing(full_rows, OPERATING_ACTIVITIES, CONSOLIDATED_CASH_FLOW);

    CompanyFinancialSummary {
        ticker: record.ticker.clone(),
        company_name: record.company_name.clone(),
        operating_profit,
        operating_profit_prev,
        operating_profit_growth: round2(growth_rate(operating_profit, operating_profit_prev)),
        net_income,
        net_income_prev,
        net_income_growth: round2(growth_rate(net_income, net_income_prev)),
        revenue,
        revenue_prev,
        revenue_growth: round2(growth_rate(revenue, revenue_prev)),
        equity,
        total_liabilities,
        operating_cash_flow,
        market_cap: quote.market_cap,
        pbr: round2(price_to_book(quote.market_cap, equity)),
        per: round2(price_to_earnings(quote.market_cap, net_income)),
        roe: round2(return_on_equity(net_income, equity)),
        debt_ratio: round2(debt_ratio(total_liabilities, equity)),
    }
}
