/// Types for BC Transfer Guide data
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

/// One agreement object as returned by the transfer guide's search API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAgreement {
    /// Encoded equivalency, e.g. `"UBC CPSC 1st (3)"` or `"No credit"`
    #[serde(rename = "Detail", default, deserialize_with = "null_as_default")]
    pub detail: String,

    #[serde(rename = "StartDate", default, deserialize_with = "null_as_default")]
    pub start_date: i64,

    /// `null` upstream for agreements that are still in effect
    #[serde(rename = "EndDate", default)]
    pub end_date: Option<i64>,

    #[serde(rename = "RcvrInstitutionCode", default, deserialize_with = "null_as_default")]
    pub receiving_institution_code: String,

    #[serde(rename = "SndrCourseCredit", default, deserialize_with = "null_as_default")]
    pub sending_credits: f32,

    #[serde(rename = "Condition", default)]
    pub condition: Option<String>,

    #[serde(
        rename = "SndrCourseNumber",
        default,
        deserialize_with = "string_or_number"
    )]
    pub sending_course_number: Option<String>,
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keeps the agreements that decode and drops the rest, so one malformed
/// record does not fail its whole results page.
fn skip_malformed<'de, D>(deserializer: D) -> Result<Vec<RawAgreement>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(agreement) => Some(agreement),
            Err(e) => {
                trace!(error = %e, "Skipping malformed agreement");
                None
            }
        })
        .collect())
}

/// The API is inconsistent about whether course numbers are strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// How a course (or pair of courses) is credited at a receiving institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransferAgreement {
    Single(SingleAgreement),
    Bundle(BundleAgreement),
}

impl TransferAgreement {
    pub fn sending_institution_code(&self) -> &str {
        match self {
            TransferAgreement::Single(a) => &a.sending_institution_code,
            TransferAgreement::Bundle(a) => &a.sending_institution_code,
        }
    }

    pub fn receiving_institution_code(&self) -> &str {
        match self {
            TransferAgreement::Single(a) => &a.receiving_institution_code,
            TransferAgreement::Bundle(a) => &a.receiving_institution_code,
        }
    }

    pub fn start_date(&self) -> i64 {
        match self {
            TransferAgreement::Single(a) => a.start_date,
            TransferAgreement::Bundle(a) => a.start_date,
        }
    }

    pub fn end_date(&self) -> Option<i64> {
        match self {
            TransferAgreement::Single(a) => a.end_date,
            TransferAgreement::Bundle(a) => a.end_date,
        }
    }
}

/// One sending course transferring as one receiving course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleAgreement {
    pub sending_course_number: String,
    pub sending_subject: String,
    pub sending_institution_code: String,
    pub sending_credits: f32,
    pub receiving_institution_code: String,
    pub receiving_subject: String,      // "No Credit" when the course does not transfer
    pub receiving_course_number: String,
    pub receiving_credits: f32,
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub details: Option<String>,
}

/// Two sending courses that together transfer as two receiving courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleAgreement {
    pub sending_course_number: [String; 2],
    pub sending_subject: [String; 2],
    pub sending_institution_code: String,
    pub sending_credits: [f32; 2],
    pub receiving_institution_code: String,
    pub receiving_subject: [String; 2],
    pub receiving_course_number: [String; 2],
    pub receiving_credits: [f32; 2],
    pub start_date: i64,
    pub end_date: Option<i64>,
    pub details: Option<String>,
}

/// Institution entry from the transfer guide's lookup API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Code")]
    pub code: String,
}

/// Subject entry from the transfer guide's lookup API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSubject {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Code")]
    pub code: String,
}

/// Body of a course-to-course search request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub sender: i64,
    pub institution_code: String,
    pub subject_id: i64,
    pub subject_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_number: Option<String>,
    pub year: i32,
    pub page_number: u32,
    pub is_public: Option<bool>,
    pub is_member: bool,
}

/// One page of course-to-course search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "totalPages", default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub courses: Vec<SearchCourse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCourse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub agreements: Vec<RawAgreement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_agreement_deserializes_null_end_date() {
        let json = r#"{
            "Detail": "UBC CPSC 1st (3)",
            "StartDate": 200509,
            "EndDate": null,
            "RcvrInstitutionCode": "UBCV",
            "SndrCourseCredit": 3.0,
            "Condition": null,
            "SndrCourseNumber": 1050
        }"#;

        let raw: RawAgreement = serde_json::from_str(json).unwrap();
        assert_eq!(raw.end_date, None);
        assert_eq!(raw.start_date, 200509);
        assert_eq!(raw.sending_course_number.as_deref(), Some("1050"));
        assert_eq!(raw.sending_credits, 3.0);
    }

    #[test]
    fn test_null_fields_do_not_fail_the_page() {
        let json = r#"{
            "totalPages": 1,
            "courses": [{"agreements": [
                {"Detail": "SFU CMPT 120 (3)", "StartDate": 202001, "RcvrInstitutionCode": "SFU",
                 "SndrCourseCredit": 3, "SndrCourseNumber": "1050"},
                {"Detail": null, "StartDate": null, "RcvrInstitutionCode": null,
                 "SndrCourseCredit": null, "SndrCourseNumber": null}
            ]}]
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        let agreements = &page.courses[0].agreements;
        assert_eq!(agreements.len(), 2);
        assert_eq!(agreements[0].sending_credits, 3.0);
        assert_eq!(agreements[1].detail, "");
        assert_eq!(agreements[1].sending_credits, 0.0);
        assert_eq!(agreements[1].receiving_institution_code, "");
    }

    #[test]
    fn test_malformed_agreement_is_dropped_from_page() {
        let json = r#"{
            "totalPages": 1,
            "courses": [{"agreements": [
                {"Detail": "SFU CMPT 120 (3)", "StartDate": 202001},
                {"Detail": "SFU CMPT 125 (3)", "StartDate": "soon"}
            ]}]
        }"#;

        let page: SearchResponse = serde_json::from_str(json).unwrap();
        let agreements = &page.courses[0].agreements;
        assert_eq!(agreements.len(), 1);
        assert_eq!(agreements[0].detail, "SFU CMPT 120 (3)");
    }

    #[test]
    fn test_agreement_serializes_with_type_tag() {
        let agreement = TransferAgreement::Single(SingleAgreement {
            sending_course_number: "1050".to_string(),
            sending_subject: "CPSC".to_string(),
            sending_institution_code: "LANG".to_string(),
            sending_credits: 3.0,
            receiving_institution_code: "SFU".to_string(),
            receiving_subject: "CMPT".to_string(),
            receiving_course_number: "120".to_string(),
            receiving_credits: 3.0,
            start_date: 202301,
            end_date: None,
            details: None,
        });

        let value = serde_json::to_value(&agreement).unwrap();
        assert_eq!(value["type"], "single");
        assert!(value["end_date"].is_null());

        let back: TransferAgreement = serde_json::from_value(value).unwrap();
        assert_eq!(back, agreement);
    }

    #[test]
    fn test_search_request_keeps_null_is_public() {
        let request = SearchRequest {
            sender: 15,
            institution_code: "LANG".to_string(),
            subject_id: 531,
            subject_code: "CPSC".to_string(),
            course_number: None,
            year: 2025,
            page_number: 1,
            is_public: None,
            is_member: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value["isPublic"].is_null());
        assert_eq!(value["pageNumber"], 1);
        assert!(value.get("courseNumber").is_none());
    }
}
