/// Database module for course schedule, transfer agreement and professor data
///
/// Scraped data is never patched: each refresh deletes everything stored for
/// the term (or the whole transfer or professor table) and inserts the new snapshot inside
/// one transaction.
mod professors;
mod transfer;
mod types;

pub use professors::ProfessorDbManager;
pub use transfer::TransferDbManager;
pub use types::{DbMeeting, DbSection, ReplaceSummary};

use crate::timetable::{Course, CourseInfo, MeetingTime, Section, SectionType, Term};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_schema.sql");

/// Opens a connection and initializes the schema.
fn open_connection(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(conn)
}

/// Maps a serde error into the rusqlite error space.
fn to_sql_error(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

fn from_sql_error(column: usize, err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

pub struct ScheduleDbManager {
    db: Mutex<Connection>,
}

impl ScheduleDbManager {
    /// Opens the database at `db_path` and initializes the schema
    pub fn new(db_path: &str) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(open_connection(db_path)?),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-query leaves nothing half-written outside a transaction
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Checks if a term already has data in the database
    pub fn term_has_data(&self, term: Term) -> Result<bool> {
        let db = self.conn();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM courses WHERE year = ?1 AND semester = ?2",
            params![term.year, term.semester],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Replaces everything stored for a term with `courses`.
    ///
    /// Document order is kept in `position` columns so reads return the same
    /// order the parser produced. A section whose CRN is already stored for
    /// the term is skipped along with its meetings.
    pub fn replace_term(&self, term: Term, courses: &[Course]) -> Result<ReplaceSummary> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let mut summary = ReplaceSummary::default();

        tx.execute(
            "DELETE FROM meetings WHERE section_id_pk IN
                (SELECT section_id_pk FROM sections WHERE year = ?1 AND semester = ?2)",
            params![term.year, term.semester],
        )?;
        tx.execute(
            "DELETE FROM sections WHERE year = ?1 AND semester = ?2",
            params![term.year, term.semester],
        )?;
        summary.deleted_courses = tx.execute(
            "DELETE FROM courses WHERE year = ?1 AND semester = ?2",
            params![term.year, term.semester],
        )?;

        for (course_pos, course) in courses.iter().enumerate() {
            tx.execute(
                "INSERT INTO courses (year, semester, course_code, subject, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
                params![
                    term.year,
                    term.semester,
                    course.course_code,
                    course.subject,
                    course_pos as i64
                ],
            )?;
            let course_id = tx.last_insert_rowid();
            summary.inserted_courses += 1;

            for (section_pos, section) in course.sections.iter().enumerate() {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO sections (
                        course_id, year, semester, crn, subject, course, section, credits,
                        title, seats_available, waitlist, additional_fees, repeat_limit,
                        notes, position
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        course_id,
                        term.year,
                        term.semester,
                        section.crn,
                        section.subject,
                        section.course,
                        section.section,
                        section.credits,
                        section.title,
                        section.seats_available,
                        section.waitlist,
                        section.additional_fees,
                        section.repeat_limit,
                        section.notes,
                        section_pos as i64
                    ],
                )?;

                if inserted == 0 {
                    warn!(
                        term = %term,
                        crn = %section.crn,
                        course_code = %course.course_code,
                        "Skipping section with duplicate CRN"
                    );
                    summary.duplicate_crns += 1;
                    continue;
                }

                let section_id_pk = tx.last_insert_rowid();
                summary.inserted_sections += 1;

                for (meeting_pos, meeting) in section.meetings.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO meetings (
                            section_id_pk, position, section_type, days, time, room, instructor
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            section_id_pk,
                            meeting_pos as i64,
                            meeting.section_type.as_str(),
                            meeting.days,
                            meeting.time,
                            meeting.room,
                            meeting.instructor
                        ],
                    )?;
                    summary.inserted_meetings += 1;
                }
            }
        }

        tx.commit()?;

        info!(
            term = %term,
            deleted_courses = summary.deleted_courses,
            inserted_courses = summary.inserted_courses,
            inserted_sections = summary.inserted_sections,
            inserted_meetings = summary.inserted_meetings,
            duplicate_crns = summary.duplicate_crns,
            "Replaced term data"
        );

        Ok(summary)
    }

    /// Stores a scraped term unless the scrape came back empty.
    ///
    /// Returns `None`, leaving stored data untouched, for an empty scrape.
    pub fn store_scraped_term(
        &self,
        term: Term,
        courses: &[Course],
    ) -> Result<Option<ReplaceSummary>> {
        if courses.is_empty() {
            warn!(term = %term, "Scrape produced no courses; keeping stored data");
            return Ok(None);
        }
        self.replace_term(term, courses).map(Some)
    }

    /// Rebuilds the stored course tree for a term, optionally for one subject.
    pub fn get_courses_for_term(&self, term: Term, subject: Option<&str>) -> Result<Vec<Course>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT c.course_id, c.course_code, c.subject,
                    s.section_id_pk, s.crn, s.subject, s.course, s.section, s.credits, s.title,
                    s.seats_available, s.waitlist, s.additional_fees, s.repeat_limit, s.notes,
                    m.section_type, m.days, m.time, m.room, m.instructor
             FROM courses c
             JOIN sections s ON s.course_id = c.course_id
             JOIN meetings m ON m.section_id_pk = s.section_id_pk
             WHERE c.year = ?1 AND c.semester = ?2 AND (?3 IS NULL OR c.subject = ?3)
             ORDER BY c.position, s.position, m.position",
        )?;

        let mut rows = stmt.query(params![term.year, term.semester, subject])?;
        let mut courses: Vec<Course> = Vec::new();
        let mut last_course_id = None;
        let mut last_section_id = None;

        while let Some(row) = rows.next()? {
            let course_id: i64 = row.get(0)?;
            let section_id: i64 = row.get(3)?;

            if last_course_id != Some(course_id) {
                courses.push(Course {
                    course_code: row.get(1)?,
                    subject: row.get(2)?,
                    sections: Vec::new(),
                });
                last_course_id = Some(course_id);
                last_section_id = None;
            }

            // Non-empty: a course was pushed above if none existed
            let Some(course) = courses.last_mut() else {
                continue;
            };

            if last_section_id != Some(section_id) {
                course.sections.push(Section {
                    crn: row.get(4)?,
                    subject: row.get(5)?,
                    course: row.get(6)?,
                    section: row.get(7)?,
                    credits: row.get(8)?,
                    title: row.get(9)?,
                    seats_available: row.get(10)?,
                    waitlist: row.get(11)?,
                    additional_fees: row.get(12)?,
                    repeat_limit: row.get(13)?,
                    notes: row.get(14)?,
                    meetings: Vec::new(),
                });
                last_section_id = Some(section_id);
            }

            if let Some(section) = course.sections.last_mut() {
                section.meetings.push(MeetingTime {
                    section_type: SectionType::from(row.get::<_, String>(15)?),
                    days: row.get(16)?,
                    time: row.get(17)?,
                    room: row.get(18)?,
                    instructor: row.get(19)?,
                });
            }
        }

        Ok(courses)
    }

    /// Gets all meetings for a section, by CRN within a term
    pub fn get_meetings_for_crn(&self, term: Term, crn: &str) -> Result<Vec<DbMeeting>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT m.meeting_id, m.section_id_pk, m.section_type, m.days, m.time,
                    m.room, m.instructor
             FROM meetings m
             JOIN sections s ON m.section_id_pk = s.section_id_pk
             WHERE s.year = ?1 AND s.semester = ?2 AND s.crn = ?3
             ORDER BY m.position",
        )?;

        let meetings = stmt.query_map(params![term.year, term.semester, crn], |row| {
            Ok(DbMeeting {
                meeting_id: row.get(0)?,
                section_id_pk: row.get(1)?,
                section_type: row.get(2)?,
                days: row.get(3)?,
                time: row.get(4)?,
                room: row.get(5)?,
                instructor: row.get(6)?,
            })
        })?;

        meetings.collect()
    }

    /// Gets all sections with their meetings for a specific term
    pub fn get_all_sections_for_term(&self, term: Term) -> Result<Vec<(DbSection, Vec<DbMeeting>)>> {
        let db = self.conn();

        let mut stmt = db.prepare(
            "SELECT s.section_id_pk, s.course_id, s.crn, s.subject, s.course, s.section,
                    s.title, s.seats_available, s.waitlist, s.notes
             FROM sections s
             JOIN courses c ON s.course_id = c.course_id
             WHERE s.year = ?1 AND s.semester = ?2
             ORDER BY c.position, s.position",
        )?;

        let sections: Vec<DbSection> = stmt
            .query_map(params![term.year, term.semester], |row| {
                Ok(DbSection {
                    section_id_pk: row.get(0)?,
                    course_id: row.get(1)?,
                    crn: row.get(2)?,
                    subject: row.get(3)?,
                    course: row.get(4)?,
                    section: row.get(5)?,
                    title: row.get(6)?,
                    seats_available: row.get(7)?,
                    waitlist: row.get(8)?,
                    notes: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        let mut meeting_stmt = db.prepare(
            "SELECT meeting_id, section_id_pk, section_type, days, time, room, instructor
             FROM meetings
             WHERE section_id_pk = ?
             ORDER BY position",
        )?;

        let mut result = Vec::with_capacity(sections.len());
        for section in sections {
            let meetings: Vec<DbMeeting> = meeting_stmt
                .query_map([section.section_id_pk], |row| {
                    Ok(DbMeeting {
                        meeting_id: row.get(0)?,
                        section_id_pk: row.get(1)?,
                        section_type: row.get(2)?,
                        days: row.get(3)?,
                        time: row.get(4)?,
                        room: row.get(5)?,
                        instructor: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>>>()?;

            result.push((section, meetings));
        }

        Ok(result)
    }

    /// Lists every term with stored data, newest first
    pub fn get_terms(&self) -> Result<Vec<Term>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT DISTINCT year, semester FROM courses ORDER BY year DESC, semester DESC",
        )?;
        let terms = stmt.query_map([], |row| Ok(Term::new(row.get(0)?, row.get(1)?)))?;
        terms.collect()
    }

    /// Replaces all stored course info
    pub fn replace_course_info(&self, infos: &[CourseInfo]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        let deleted = tx.execute("DELETE FROM course_info", [])?;
        for info in infos {
            let attributes = serde_json::to_string(&info.attributes).map_err(to_sql_error)?;
            tx.execute(
                "INSERT OR REPLACE INTO course_info
                    (course_code, title, description, attributes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, datetime('now'))",
                params![info.course_code, info.title, info.description, attributes],
            )?;
        }

        tx.commit()?;
        info!(deleted, inserted = infos.len(), "Replaced course info");
        Ok(infos.len())
    }

    /// Gets title, description and attributes for one course code
    pub fn get_course_info(&self, course_code: &str) -> Result<Option<CourseInfo>> {
        let db = self.conn();
        db.query_row(
            "SELECT course_code, title, description, attributes
             FROM course_info WHERE course_code = ?1",
            [course_code],
            |row| {
                let attributes: String = row.get(3)?;
                Ok(CourseInfo {
                    course_code: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    attributes: serde_json::from_str(&attributes)
                        .map_err(|e| from_sql_error(3, e))?,
                })
            },
        )
        .optional()
    }
}
