/// Types for timetable data scraped from the registration system
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ScrapeError;

/// A course with every section offered in a term, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_code: String, // e.g., "CPSC 1050"
    pub subject: String,     // e.g., "CPSC"
    pub sections: Vec<Section>,
}

/// One offered instance of a course, identified by its CRN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub crn: String,
    pub subject: String,
    pub course: String,
    pub section: String,
    pub credits: String,
    pub title: String,
    pub seats_available: String,
    pub waitlist: String,
    pub additional_fees: String,
    pub repeat_limit: String,
    pub notes: Option<String>,
    /// Seed meeting first, then continuation rows in row order
    pub meetings: Vec<MeetingTime>,
}

/// One day/time/room/instructor combination of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTime {
    pub section_type: SectionType,
    /// 7 slots, one per weekday starting Monday; `-` marks an inactive day
    pub days: String,
    /// `-` for TBA/online, otherwise `HHMM-HHMM`
    pub time: String,
    pub room: String,
    pub instructor: String,
}

impl MeetingTime {
    /// Returns false for TBA/online meetings that have no place on a time grid.
    pub fn is_scheduled(&self) -> bool {
        self.time_span().is_some() && !self.active_days().is_empty()
    }

    /// Weekday indices (0 = Monday) whose slot in the mask is not a dash.
    pub fn active_days(&self) -> Vec<usize> {
        self.days
            .chars()
            .take(7)
            .enumerate()
            .filter(|(_, c)| *c != '-' && !c.is_whitespace())
            .map(|(i, _)| i)
            .collect()
    }

    /// Parses `HHMM-HHMM` into start and end minutes since midnight.
    pub fn time_span(&self) -> Option<(u16, u16)> {
        let (start, end) = self.time.split_once('-')?;
        let start = parse_hhmm(start)?;
        let end = parse_hhmm(end)?;
        (start <= end).then_some((start, end))
    }
}

fn parse_hhmm(s: &str) -> Option<u16> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u16 = s[..2].parse().ok()?;
    let minutes: u16 = s[2..].parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

/// Kind of meeting as labelled in the timetable's "Type" column.
///
/// Labels outside the known set are kept verbatim in `Other` so a meeting is
/// never lost because the registrar introduced a new type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SectionType {
    Lecture,
    Lab,
    Seminar,
    Www,
    Tutorial,
    Studio,
    Clinical,
    Practicum,
    FieldStudy,
    FieldSchool,
    OnSiteWork,
    ExchangeInternational,
    Exam,
    FlexibleAssessment,
    CoOp,
    GuidedIndependentStudy,
    Empty,
    Other(String),
}

impl SectionType {
    pub fn as_str(&self) -> &str {
        match self {
            SectionType::Lecture => "Lecture",
            SectionType::Lab => "Lab",
            SectionType::Seminar => "Seminar",
            SectionType::Www => "WWW",
            SectionType::Tutorial => "Tutorial",
            SectionType::Studio => "Studio",
            SectionType::Clinical => "Clinical",
            SectionType::Practicum => "Practicum",
            SectionType::FieldStudy => "Field Study",
            SectionType::FieldSchool => "Field School",
            SectionType::OnSiteWork => "On Site Work",
            SectionType::ExchangeInternational => "Exchange-International",
            SectionType::Exam => "Exam",
            SectionType::FlexibleAssessment => "Flexible Assessment",
            SectionType::CoOp => "CO-OP",
            SectionType::GuidedIndependentStudy => "GIS Guided Independent Study",
            SectionType::Empty => "",
            SectionType::Other(label) => label,
        }
    }
}

impl From<&str> for SectionType {
    fn from(label: &str) -> Self {
        match label {
            "Lecture" => SectionType::Lecture,
            "Lab" => SectionType::Lab,
            "Seminar" => SectionType::Seminar,
            "WWW" => SectionType::Www,
            "Tutorial" => SectionType::Tutorial,
            "Studio" => SectionType::Studio,
            "Clinical" => SectionType::Clinical,
            "Practicum" => SectionType::Practicum,
            "Field Study" => SectionType::FieldStudy,
            "Field School" => SectionType::FieldSchool,
            "On Site Work" => SectionType::OnSiteWork,
            "Exchange-International" => SectionType::ExchangeInternational,
            "Exam" => SectionType::Exam,
            "Flexible Assessment" => SectionType::FlexibleAssessment,
            "CO-OP" => SectionType::CoOp,
            "GIS Guided Independent Study" => SectionType::GuidedIndependentStudy,
            "" => SectionType::Empty,
            other => SectionType::Other(other.to_string()),
        }
    }
}

impl From<String> for SectionType {
    fn from(label: String) -> Self {
        SectionType::from(label.as_str())
    }
}

impl From<SectionType> for String {
    fn from(section_type: SectionType) -> Self {
        section_type.as_str().to_string()
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counters collected during a timetable scan.
///
/// Purely diagnostic: unmatched rows are still dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub rows_seen: usize,
    pub header_rows: usize,
    pub section_rows: usize,
    pub continuation_rows: usize,
    pub notes_rows: usize,
    pub skipped_rows: usize,
}

/// A `(year, semester)` pair, rendered upstream as e.g. `202530`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub year: i32,
    pub semester: u32,
}

impl Term {
    pub const SPRING: u32 = 10;
    pub const SUMMER: u32 = 20;
    pub const FALL: u32 = 30;

    pub fn new(year: i32, semester: u32) -> Self {
        Self { year, semester }
    }

    /// Maps a calendar month (1-12) to its semester code, or 0 when out of range.
    pub fn current_semester(month: u32) -> u32 {
        match month {
            1..=4 => Self::SPRING,
            5..=8 => Self::SUMMER,
            9..=12 => Self::FALL,
            _ => 0,
        }
    }

    /// The term in progress today, by local date.
    pub fn current() -> Self {
        use chrono::Datelike;
        let today = chrono::Local::now().date_naive();
        Self::new(today.year(), Self::current_semester(today.month()))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.year, self.semester)
    }
}

impl FromStr for Term {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScrapeError::InvalidTerm {
            term: s.to_string(),
        };

        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let semester: u32 = s[4..].parse().map_err(|_| invalid())?;
        if !matches!(semester, Self::SPRING | Self::SUMMER | Self::FALL) {
            return Err(invalid());
        }

        Ok(Self { year, semester })
    }
}

/// A course's attribute flags from the course attribute table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAttribute {
    pub course_code: String,
    pub attributes: Vec<String>, // e.g., ["HUM", "UT"]
}

/// Title and description scraped from a course's public page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDescription {
    pub course_code: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Description merged with attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub course_code: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub attributes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting(days: &str, time: &str) -> MeetingTime {
        MeetingTime {
            section_type: SectionType::Lecture,
            days: days.to_string(),
            time: time.to_string(),
            room: "A130".to_string(),
            instructor: "Staff".to_string(),
        }
    }

    #[test]
    fn test_time_span_parses_hhmm() {
        assert_eq!(meeting("M-W----", "0830-1020").time_span(), Some((510, 620)));
        assert_eq!(meeting("M-W----", "-").time_span(), None);
        assert_eq!(meeting("M-W----", "2530-2600").time_span(), None);
    }

    #[test]
    fn test_online_meeting_is_not_scheduled() {
        assert!(meeting("M-W----", "0830-1020").is_scheduled());
        assert!(!meeting("-------", "-").is_scheduled());
        assert!(!meeting("-------", "0830-1020").is_scheduled());
    }

    #[test]
    fn test_active_days() {
        assert_eq!(meeting("M-W-F--", "-").active_days(), vec![0, 2, 4]);
        assert!(meeting("-------", "-").active_days().is_empty());
    }

    #[test]
    fn test_section_type_labels() {
        assert_eq!(SectionType::from("Lecture"), SectionType::Lecture);
        assert_eq!(SectionType::from("CO-OP"), SectionType::CoOp);
        assert_eq!(SectionType::from(""), SectionType::Empty);
        assert_eq!(
            SectionType::from("Hybrid"),
            SectionType::Other("Hybrid".to_string())
        );
        assert_eq!(String::from(SectionType::Www), "WWW");
    }

    #[test]
    fn test_section_type_serializes_as_label() {
        let json = serde_json::to_string(&SectionType::FieldStudy).unwrap();
        assert_eq!(json, "\"Field Study\"");
        let back: SectionType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SectionType::FieldStudy);
    }

    #[test]
    fn test_current_semester() {
        assert_eq!(Term::current_semester(1), 10);
        assert_eq!(Term::current_semester(4), 10);
        assert_eq!(Term::current_semester(5), 20);
        assert_eq!(Term::current_semester(9), 30);
        assert_eq!(Term::current_semester(13), 0);
    }

    #[test]
    fn test_term_display_and_parse() {
        let term: Term = "202530".parse().unwrap();
        assert_eq!(term, Term::new(2025, 30));
        assert_eq!(term.to_string(), "202530");
        assert!("202540".parse::<Term>().is_err());
        assert!("2025".parse::<Term>().is_err());
    }
}
