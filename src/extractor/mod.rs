use crate::models::StatementRow;

/// Line-item labels used by the analysis pipeline.
pub const OPERATING_PROFIT: &str = "영업이익";
pub const NET_INCOME: &str = "당기순이익";
pub const REVENUE: &str = "매출액";
pub const TOTAL_EQUITY: &str = "자본총계";
pub const TOTAL_LIABILITIES: &str = "부채총계";
pub const OPERATING_ACTIVITIES: &str = "영업활동";

/// Statement-type labels.
pub const CONSOLIDATED: &str = "연결재무제표";
pub const CONSOLIDATED_CASH_FLOW: &str = "연결현금흐름표";

/// Parse a reported amount, stripping thousands separators. Returns
/// `None` for empty markers ("-") and anything that is not a signed
/// integer after stripping.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse().ok()
}

/// Extract the first row matching the account label and statement type
/// exactly, in table order. An unparseable amount counts as not found for
/// this item only.
pub fn extract_amount(rows: &[StatementRow], account: &str, statement: &str) -> Option<i64> {
    rows.iter()
        .find(|row| row.account_name == account && row.statement_name == statement)
        .and_then(|row| parse_amount(&row.amount))
}

/// Like [`extract_amount`], but matches rows whose account label merely
/// contains the given fragment. Used for the operating-cash-flow line,
/// whose exact wording varies between filers.
pub fn extract_amount_containing(
    rows: &[StatementRow],
    account_fragment: &str,
    statement: &str,
) -> Option<i64> {
    rows.iter()
        .find(|row| {
            row.account_name.contains(account_fragment) && row.statement_name == statement
        })
        .and_then(|row| parse_amount(&row.amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(account: &str, statement: &str, amount: &str) -> StatementRow {
        StatementRow {
            account_name: account.to_string(),
            statement_name: statement.to_string(),
            section_name: None,
            amount: amount.to_string(),
            prior_amount: None,
        }
    }

    #[test]
    fn test_parse_amount_strips_separators() {
        assert_eq!(parse_amount("6,408,958,000,000"), Some(6_408_958_000_000));
        assert_eq!(parse_amount("-123,456"), Some(-123_456));
        assert_eq!(parse_amount(" 1,000 "), Some(1_000));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("1.5"), None);
    }

    #[test]
    fn test_extract_matches_statement_type() {
        let rows = vec![
            row(OPERATING_PROFIT, "재무제표", "100"),
            row(OPERATING_PROFIT, CONSOLIDATED, "2,000"),
        ];
        // Two rows share the label; only the consolidated one may match.
        assert_eq!(extract_amount(&rows, OPERATING_PROFIT, CONSOLIDATED), Some(2_000));
        assert_eq!(extract_amount(&rows, OPERATING_PROFIT, "재무제표"), Some(100));
    }

    #[test]
    fn test_extract_first_row_wins() {
        let rows = vec![
            row(NET_INCOME, CONSOLIDATED, "10"),
            row(NET_INCOME, CONSOLIDATED, "20"),
        ];
        assert_eq!(extract_amount(&rows, NET_INCOME, CONSOLIDATED), Some(10));
    }

    #[test]
    fn test_extract_no_match_is_none() {
        let rows = vec![row(REVENUE, CONSOLIDATED, "5")];
        assert_eq!(extract_amount(&rows, OPERATING_PROFIT, CONSOLIDATED), None);
    }

    #[test]
    fn test_unparseable_amount_is_none_for_that_item_only() {
        let rows = vec![
            row(OPERATING_PROFIT, CONSOLIDATED, "불명"),
            row(REVENUE, CONSOLIDATED, "1,234"),
        ];
        assert_eq!(extract_amount(&rows, OPERATING_PROFIT, CONSOLIDATED), None);
        assert_eq!(extract_amount(&rows, REVENUE, CONSOLIDATED), Some(1_234));
    }

    #[test]
    fn test_extract_containing() {
        let rows = vec![row(
            "영업활동으로인한현금흐름",
            CONSOLIDATED_CASH_FLOW,
            "345,678",
        )];
        assert_eq!(
            extract_amount_containing(&rows, OPERATING_ACTIVITIES, CONSOLIDATED_CASH_FLOW),
            Some(345_678)
        );
        assert_eq!(
            extract_amount_containing(&rows, OPERATING_ACTIVITIES, CONSOLIDATED),
            None
        );
    }
}
