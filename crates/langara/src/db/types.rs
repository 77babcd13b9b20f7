/// Database types for course schedule data
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbSection {
    pub section_id_pk: i64,
    pub course_id: i64,
    pub crn: String,
    pub subject: String,
    pub course: String,
    pub section: String,
    pub title: String,
    pub seats_available: String,
    pub waitlist: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbMeeting {
    pub meeting_id: i64,
    pub section_id_pk: i64,
    pub section_type: String,
    pub days: String,
    pub time: String,
    pub room: String,
    pub instructor: String,
}

/// Row counts from replacing a term's data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaceSummary {
    pub deleted_courses: usize,
    pub inserted_courses: usize,
    pub inserted_sections: usize,
    pub inserted_meetings: usize,
    /// Sections dropped because their CRN was already stored for the term
    pub duplicate_crns: usize,
}
