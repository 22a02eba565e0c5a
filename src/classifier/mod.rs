use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Filing;

/// Exchange membership inferred from the numeric stock code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exchange {
    Kospi,
    Kosdaq,
    Other,
}

impl Exchange {
    /// Quote-API ticker suffix for the exchange. Codes classified as
    /// `Other` have no quotable symbol.
    pub fn ticker_suffix(&self) -> Option<&'static str> {
        match self {
            Exchange::Kospi => Some(".KS"),
            Exchange::Kosdaq => Some(".KQ"),
            Exchange::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Kospi => "KOSPI",
            Exchange::Kosdaq => "KOSDAQ",
            Exchange::Other => "기타",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies 6-digit stock codes into exchanges by numeric range.
///
/// The KOSPI/KOSDAQ split point has shifted over time and the upstream
/// data sources disagree on it, so the boundary is injected rather than
/// hard-coded (`Config::kosdaq_boundary`, default 400000).
#[derive(Debug, Clone, Copy)]
pub struct ExchangeClassifier {
    kosdaq_boundary: u32,
}

impl ExchangeClassifier {
    pub fn new(kosdaq_boundary: u32) -> Self {
        Self { kosdaq_boundary }
    }

    /// Pure and total: any string that is not a plain digit code in
    /// [1, 999999] classifies as `Other`.
    pub fn classify(&self, code: &str) -> Exchange {
        let code = code.trim();
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Exchange::Other;
        }
        let n: u32 = match code.parse() {
            Ok(n) => n,
            Err(_) => return Exchange::Other, // overflow on absurdly long codes
        };
        match n {
            0 => Exchange::Other,
            n if n > 999_999 => Exchange::Other,
            n if n < self.kosdaq_boundary => Exchange::Kospi,
            _ => Exchange::Kosdaq,
        }
    }
}

/// One ordered classification rule: the label applies when the text
/// contains any of `any_of` and none of `none_of`.
pub struct KeywordRule<L> {
    pub any_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
    pub label: L,
}

/// Evaluate an ordered rule table top to bottom; first hit wins.
pub fn first_matching_label<L: Copy>(rules: &[KeywordRule<L>], text: &str) -> Option<L> {
    rules
        .iter()
        .find(|rule| {
            rule.any_of.iter().any(|kw| text.contains(kw))
                && !rule.none_of.iter().any(|kw| text.contains(kw))
        })
        .map(|rule| rule.label)
}

/// Audit opinion inferred from disclosure titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOpinion {
    Unqualified,
    Qualified,
    Adverse,
    Disclaimer,
    /// An audit report exists but its title states no opinion.
    Estimated,
    /// Audit reports exist, none of the recent titles carried an opinion,
    /// and there is no business report to corroborate an estimate.
    Unconfirmed,
    /// Business reports exist but no audit report does.
    Insufficient,
    NoAuditReport,
    NoDisclosures,
    /// The filing list could not be fetched; says nothing about whether
    /// disclosures exist.
    FetchFailed,
}

impl fmt::Display for AuditOpinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditOpinion::Unqualified => "적정의견",
            AuditOpinion::Qualified => "한정의견",
            AuditOpinion::Adverse => "부적정의견",
            AuditOpinion::Disclaimer => "의견거절",
            AuditOpinion::Estimated => "추정 적정의견",
            AuditOpinion::Unconfirmed => "감사의견 미확인",
            AuditOpinion::Insufficient => "감사정보 불충분",
            AuditOpinion::NoAuditReport => "감사보고서 없음",
            AuditOpinion::NoDisclosures => "공시정보 없음",
            AuditOpinion::FetchFailed => "조회 실패",
        };
        f.write_str(label)
    }
}

/// Title keywords, strongest signal first. "부적정" contains "적정" as a
/// substring, so the unqualified rule both comes last and carries guards.
const AUDIT_TITLE_RULES: &[KeywordRule<AuditOpinion>] = &[
    KeywordRule { any_of: &["한정"], none_of: &[], label: AuditOpinion::Qualified },
    KeywordRule { any_of: &["부적정"], none_of: &[], label: AuditOpinion::Adverse },
    KeywordRule { any_of: &["의견거절", "거절"], none_of: &[], label: AuditOpinion::Disclaimer },
    KeywordRule { any_of: &["적정"], none_of: &["한정", "부적정"], label: AuditOpinion::Unqualified },
    KeywordRule { any_of: &["감사보고서"], none_of: &[], label: AuditOpinion::Estimated },
];

const AUDIT_REPORT_MARKERS: &[&str] = &["감사보고서", "외부감사", "회계감사"];
pub const BUSINESS_REPORT_MARKER: &str = "사업보고서";

/// Classification result together with the receipt year it was based on,
/// formatted with the report year appended ("적정의견 (2024년)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedOpinion {
    pub opinion: AuditOpinion,
    pub year: Option<String>,
}

impl fmt::Display for ClassifiedOpinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.year {
            Some(year) => write!(f, "{} ({}년)", self.opinion, year),
            None => write!(f, "{}", self.opinion),
        }
    }
}

fn newest_first<'a>(filings: &'a [Filing], marker_match: impl Fn(&str) -> bool) -> Vec<&'a Filing> {
    let mut matched: Vec<&Filing> = filings
        .iter()
        .filter(|filing| marker_match(&filing.report_name))
        .collect();
    // Receipt dates are YYYYMMDD, so lexical order is chronological.
    matched.sort_by(|a, b| b.receipt_date.cmp(&a.receipt_date));
    matched
}

/// Infer the audit opinion from a company's disclosure list. Only the
/// three most recent audit-report titles are consulted before falling
/// back to business-report heuristics.
pub fn classify_audit_opinion(filings: &[Filing]) -> ClassifiedOpinion {
    if filings.is_empty() {
        return ClassifiedOpinion { opinion: AuditOpinion::NoDisclosures, year: None };
    }

    let audit_reports = newest_first(filings, |name| {
        AUDIT_REPORT_MARKERS.iter().any(|marker| name.contains(marker))
    });

    for report in audit_reports.iter().take(3) {
        if let Some(opinion) = first_matching_label(AUDIT_TITLE_RULES, &report.report_name) {
            return ClassifiedOpinion {
                opinion,
                year: report.receipt_year().map(str::to_string),
            };
        }
    }

    let business_reports = newest_first(filings, |name| name.contains(BUSINESS_REPORT_MARKER));
    if let Some(latest) = business_reports.first() {
        let year = latest.receipt_year().map(str::to_string);
        let opinion = if audit_reports.is_empty() {
            AuditOpinion::Insufficient
        } else {
            AuditOpinion::Estimated
        };
        return ClassifiedOpinion { opinion, year };
    }

    // Audit reports exist but no title stated an opinion, and there is
    // no business report to corroborate an estimate.
    match audit_reports.first() {
        Some(latest) => ClassifiedOpinion {
            opinion: AuditOpinion::Unconfirmed,
            year: latest.receipt_year().map(str::to_string),
        },
        None => ClassifiedOpinion { opinion: AuditOpinion::NoAuditReport, year: None },
    }
}

/// Internal-control effectiveness label inferred from the latest business
/// report's title and an optional body excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAssessment {
    Effective,
    Adequate,
    Sound,
    Deficient,
    Adverse,
    MaterialWeakness,
    NeedsImprovement,
    NeedsRemediation,
    /// A control section exists but states no assessment.
    ConfirmedOperating,
    /// The report title hints at enforcement or restatement issues.
    PossibleIssue,
    /// Nothing contradicts normal operation; assumed from a clean title.
    AssumedOperating,
    NoBusinessReport,
    NoDisclosures,
    /// The filing list could not be fetched; says nothing about whether
    /// disclosures exist.
    FetchFailed,
}

impl fmt::Display for ControlAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ControlAssessment::Effective => "효과적",
            ControlAssessment::Adequate => "적정",
            ControlAssessment::Sound => "양호",
            ControlAssessment::Deficient => "미흡",
            ControlAssessment::Adverse => "부적정",
            ControlAssessment::MaterialWeakness => "중요한 취약점 존재",
            ControlAssessment::NeedsImprovement => "개선필요",
            ControlAssessment::NeedsRemediation => "보완필요",
            ControlAssessment::ConfirmedOperating => "내부회계관리제도 운영 확인됨",
            ControlAssessment::PossibleIssue => "내부통제 관련 문제 가능성",
            ControlAssessment::AssumedOperating => "내부회계관리제도 운영 추정",
            ControlAssessment::NoBusinessReport => "사업보고서 없음",
            ControlAssessment::NoDisclosures => "공시정보 없음",
            ControlAssessment::FetchFailed => "조회 실패",
        };
        f.write_str(label)
    }
}

const CONTROL_CONTENT_RULES: &[KeywordRule<ControlAssessment>] = &[
    KeywordRule { any_of: &["효과적"], none_of: &[], label: ControlAssessment::Effective },
    KeywordRule { any_of: &["부적정"], none_of: &[], label: ControlAssessment::Adverse },
    KeywordRule { any_of: &["중요한 취약점"], none_of: &[], label: ControlAssessment::MaterialWeakness },
    KeywordRule { any_of: &["적정"], none_of: &["부적정"], label: ControlAssessment::Adequate },
    KeywordRule { any_of: &["양호"], none_of: &[], label: ControlAssessment::Sound },
    KeywordRule { any_of: &["미흡"], none_of: &[], label: ControlAssessment::Deficient },
    KeywordRule { any_of: &["개선"], none_of: &[], label: ControlAssessment::NeedsImprovement },
    KeywordRule { any_of: &["보완"], none_of: &[], label: ControlAssessment::NeedsRemediation },
];

const CONTROL_SECTION_MARKERS: &[&str] = &["내부통제", "내부회계", "회계관리제도"];

const PROBLEM_TITLE_RULES: &[KeywordRule<ControlAssessment>] = &[KeywordRule {
    any_of: &["정정", "감리", "제재", "위반", "불성실"],
    none_of: &[],
    label: ControlAssessment::PossibleIssue,
}];

/// Result of the internal-control heuristic, with the report year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAssessment {
    pub assessment: ControlAssessment,
    pub year: Option<String>,
}

impl fmt::Display for ClassifiedAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.year {
            Some(year) => write!(f, "{} ({}년)", self.assessment, year),
            None => write!(f, "{}", self.assessment),
        }
    }
}

/// Infer internal-control effectiveness from the disclosure list plus an
/// optional excerpt of the latest business report's body. The excerpt is
/// only consulted when it actually mentions the control system.
pub fn classify_internal_control(filings: &[Filing], excerpt: Option<&str>) -> ClassifiedAssessment {
    if filings.is_empty() {
        return ClassifiedAssessment { assessment: ControlAssessment::NoDisclosures, year: None };
    }

    let business_reports = newest_first(filings, |name| name.contains(BUSINESS_REPORT_MARKER));
    let latest = match business_reports.first() {
        Some(latest) => latest,
        None => {
            return ClassifiedAssessment {
                assessment: ControlAssessment::NoBusinessReport,
                year: None,
            }
        }
    };
    let year = latest.receipt_year().map(str::to_string);

    if let Some(body) = excerpt {
        if CONTROL_SECTION_MARKERS.iter().any(|marker| body.contains(marker)) {
            if let Some(assessment) = first_matching_label(CONTROL_CONTENT_RULES, body) {
                return ClassifiedAssessment { assessment, year };
            }
            return ClassifiedAssessment {
                assessment: ControlAssessment::ConfirmedOperating,
                year,
            };
        }
    }

    if let Some(assessment) = first_matching_label(PROBLEM_TITLE_RULES, &latest.report_name) {
        return ClassifiedAssessment { assessment, year };
    }

    ClassifiedAssessment { assessment: ControlAssessment::AssumedOperating, year }
}

/// Company-name keywords marking funds, trusts and other investment
/// vehicles that carry a code in the registry without being ordinary
/// listed companies.
const INVESTMENT_VEHICLE_KEYWORDS: &[&str] = &[
    "사모",
    "투자조합",
    "펀드",
    "리츠",
    "REITs",
    "REIT",
    "자산운용",
    "신탁",
    "기금",
    "조합",
    "합자",
    "합명",
    "유한회사",
    "유한책임회사",
    "투자회사",
];

/// True when the company name marks an investment vehicle rather than an
/// ordinary listed company.
pub fn is_investment_vehicle(company_name: &str) -> bool {
    INVESTMENT_VEHICLE_KEYWORDS
        .iter()
        .any(|kw| company_name.contains(kw))
}
