/// Transfer agreement module
///
/// Agreements come from the BC Transfer Guide with the receiving side encoded
/// as free text in `Detail`. Three shapes exist:
/// - `A X 1 (3) & B Y 2 (3) = C Z 1 (3) & D W 2 (3)`: two courses for two
/// - `... & ...` without `=`: a requirement fulfilled under a condition
/// - anything else: a plain 1:1 transfer, or the literal `No credit`
pub mod cache;
pub mod client;
mod error;
mod types;

pub use error::TransferError;
pub use types::*;

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

/// Receiving subject and course number used when a course does not transfer.
pub const NO_CREDIT: &str = "No Credit";

/// Detail text the transfer guide uses for courses that do not transfer.
const NO_CREDIT_DETAIL: &str = "No credit";

/// Matches one course token: optional institution code, subject, number and
/// credits, e.g. `UBC CPSC 100 (3)` or `SFU MATH 1XX (3)`.
///
/// Course numbers are digits, or a run of `X`/`1-9` for unassigned numbers.
static COURSE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Z]+\s+)?([A-Z]+)\s+(\d+|[X1-9]+)\s+\((\d+)\)").unwrap()
});

/// A course parsed from a detail token.
#[derive(Debug, Clone, PartialEq)]
struct CourseToken {
    subject: String,
    number: String,
    credits: f32,
}

impl CourseToken {
    fn from_captures(caps: &Captures) -> Option<Self> {
        Some(Self {
            subject: caps.get(1)?.as_str().to_string(),
            number: caps.get(2)?.as_str().to_string(),
            credits: caps.get(3)?.as_str().parse().ok()?,
        })
    }
}

fn match_course(text: &str) -> Option<CourseToken> {
    COURSE_TOKEN_REGEX
        .captures(text)
        .and_then(|caps| CourseToken::from_captures(&caps))
}

/// Matches exactly the first two `&`-separated tokens of one side of a bundle.
fn match_course_pair(side: &str) -> Option<[CourseToken; 2]> {
    let mut tokens = side.split('&').map(str::trim);
    let first = match_course(tokens.next()?)?;
    let second = match_course(tokens.next()?)?;
    Some([first, second])
}

/// Converts one upstream agreement into a transfer record.
///
/// # Arguments
/// * `raw` - The agreement object from the search API
/// * `course_number` - Sending course number, e.g. `"1050"`
/// * `subject` - Sending subject code, e.g. `"CPSC"`
/// * `institution_code` - Sending institution code, e.g. `"LANG"`
///
/// # Returns
/// * `Some(TransferAgreement)` - The decoded agreement
/// * `None` - If the detail text has no recognizable course shape
pub fn process_agreement(
    raw: &RawAgreement,
    course_number: &str,
    subject: &str,
    institution_code: &str,
) -> Option<TransferAgreement> {
    let detail = raw.detail.as_str();

    let single = |receiving: CourseToken, details: Option<String>| SingleAgreement {
        sending_course_number: course_number.to_string(),
        sending_subject: subject.to_string(),
        sending_institution_code: institution_code.to_string(),
        sending_credits: raw.sending_credits,
        receiving_institution_code: raw.receiving_institution_code.clone(),
        receiving_subject: receiving.subject,
        receiving_course_number: receiving.number,
        receiving_credits: receiving.credits,
        start_date: raw.start_date,
        end_date: raw.end_date,
        details,
    };

    let agreement = if detail.contains('=') {
        let mut halves = detail.split('=').map(str::trim);
        let from = halves.next().and_then(match_course_pair);
        let to = halves.next().and_then(match_course_pair);

        // All four courses or nothing
        let (Some([from_a, from_b]), Some([to_a, to_b])) = (from, to) else {
            trace!(detail, "Discarding bundle without two courses on each side");
            return None;
        };

        TransferAgreement::Bundle(BundleAgreement {
            sending_course_number: [from_a.number, from_b.number],
            sending_subject: [from_a.subject, from_b.subject],
            sending_institution_code: institution_code.to_string(),
            sending_credits: [from_a.credits, from_b.credits],
            receiving_institution_code: raw.receiving_institution_code.clone(),
            receiving_subject: [to_a.subject, to_b.subject],
            receiving_course_number: [to_a.number, to_b.number],
            receiving_credits: [to_a.credits, to_b.credits],
            start_date: raw.start_date,
            end_date: raw.end_date,
            details: None,
        })
    } else if detail.contains('&') {
        let receiving = match_course(detail)?;
        let condition = raw
            .condition
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| detail.to_string());
        TransferAgreement::Single(single(receiving, Some(condition)))
    } else if detail.trim() == NO_CREDIT_DETAIL {
        let receiving = CourseToken {
            subject: NO_CREDIT.to_string(),
            number: NO_CREDIT.to_string(),
            credits: 0.0,
        };
        TransferAgreement::Single(single(receiving, None))
    } else {
        let Some(receiving) = match_course(detail) else {
            trace!(detail, "Discarding agreement with unrecognized detail");
            return None;
        };
        TransferAgreement::Single(single(receiving, None))
    };

    Some(agreement)
}

/// Processes a batch of agreements for the same sending course, dropping the
/// ones whose detail text is not recognized.
pub fn process_agreements(
    raws: &[RawAgreement],
    course_number: &str,
    subject: &str,
    institution_code: &str,
) -> Vec<TransferAgreement> {
    raws.iter()
        .filter_map(|raw| process_agreement(raw, course_number, subject, institution_code))
        .collect()
}
