/// Timetable scraping module
///
/// The registration system publishes a term's full course listing as one flat
/// HTML table. Courses, sections and extra meeting times are only told apart
/// by the shape of each row, so the scan below is a single forward pass that
/// attaches every row to whatever course/section was most recently opened.
pub mod attributes;
pub mod client;
mod error;
pub mod info;
pub mod subjects;
mod types;

pub use error::ScrapeError;
pub use types::*;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Cell offsets of the timetable's fixed column layout.
///
/// If the registrar changes the table, recalibrate here.
pub mod column {
    pub const SEATS_AVAILABLE: usize = 1;
    pub const WAITLIST: usize = 2;
    pub const CRN: usize = 4;
    pub const SUBJECT: usize = 5;
    pub const COURSE: usize = 6;
    pub const SECTION: usize = 7;
    pub const CREDITS: usize = 8;
    pub const TITLE: usize = 9;
    pub const ADDITIONAL_FEES: usize = 10;
    pub const REPEAT_LIMIT: usize = 11;
    pub const TYPE: usize = 12;
    pub const DAYS: usize = 13;
    pub const TIME: usize = 14;
    pub const ROOM: usize = 17;
    pub const INSTRUCTOR: usize = 18;

    /// Minimum number of cells for a section or continuation row.
    pub const COUNT: usize = 19;
}

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.dataentrytable tr").unwrap());
static HEADER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"td[colspan="19"].dedefault b"#).unwrap());
static NOTES_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"td[colspan="6"] em"#).unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Matches a course code such as `CPSC 1050`.
pub(crate) static COURSE_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,4}\s[0-9]{4}$").unwrap());

/// Parses a term's course listing into courses, sections and meeting times.
///
/// Never fails: rows that match no known shape are skipped. An empty result
/// is a valid return value and the caller decides what it means.
pub fn parse_course_data(html: &str) -> Vec<Course> {
    parse_course_data_with_stats(html).0
}

/// Same as [`parse_course_data`], also returning per-kind row counters.
pub fn parse_course_data_with_stats(html: &str) -> (Vec<Course>, ParseStats) {
    let document = Html::parse_document(html);

    let (courses, stats) = document
        .select(&ROW_SELECTOR)
        .map(|row| classify_row(&row))
        .fold(ParserState::default(), ParserState::apply)
        .finish();

    debug!(
        courses = courses.len(),
        rows_seen = stats.rows_seen,
        header_rows = stats.header_rows,
        section_rows = stats.section_rows,
        continuation_rows = stats.continuation_rows,
        notes_rows = stats.notes_rows,
        skipped_rows = stats.skipped_rows,
        "Parsed timetable"
    );

    (courses, stats)
}

/// Shape of a single table row.
#[derive(Debug, Clone, PartialEq)]
enum Row {
    /// Course header; `None` when the bold text is not a course code
    Header(Option<String>),
    Section(Section),
    Continuation(MeetingTime),
    Notes(String),
    Unrecognized,
}

/// Decides what a row is, checking header, section, continuation and notes
/// shapes in that order.
fn classify_row(row: &ElementRef) -> Row {
    if let Some(code) = joined_text(row, &HEADER_SELECTOR) {
        return if COURSE_CODE_REGEX.is_match(&code) {
            Row::Header(Some(code))
        } else {
            Row::Header(None)
        };
    }

    let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
    if cells.len() >= column::COUNT {
        let crn = cell_text(&cells, column::CRN);

        if is_digit_token(&crn) {
            return Row::Section(Section {
                crn,
                subject: cell_text(&cells, column::SUBJECT),
                course: cell_text(&cells, column::COURSE),
                section: cell_text(&cells, column::SECTION),
                credits: cell_text(&cells, column::CREDITS),
                title: cell_text(&cells, column::TITLE),
                seats_available: cell_text(&cells, column::SEATS_AVAILABLE),
                waitlist: cell_text(&cells, column::WAITLIST),
                additional_fees: cell_text(&cells, column::ADDITIONAL_FEES),
                repeat_limit: cell_text(&cells, column::REPEAT_LIMIT),
                notes: None,
                meetings: vec![meeting_from_cells(&cells)],
            });
        }

        let meeting = meeting_from_cells(&cells);
        let has_type = !meeting.section_type.as_str().is_empty();
        let has_slot =
            !meeting.days.is_empty() || !meeting.time.is_empty() || !meeting.room.is_empty();
        if has_type && has_slot {
            return Row::Continuation(meeting);
        }
    }

    if let Some(notes) = joined_text(row, &NOTES_SELECTOR) {
        return Row::Notes(notes);
    }

    Row::Unrecognized
}

fn meeting_from_cells(cells: &[ElementRef]) -> MeetingTime {
    MeetingTime {
        section_type: SectionType::from(cell_text(cells, column::TYPE)),
        days: cell_text(cells, column::DAYS),
        time: cell_text(cells, column::TIME),
        room: cell_text(cells, column::ROOM),
        instructor: cell_text(cells, column::INSTRUCTOR),
    }
}

fn cell_text(cells: &[ElementRef], index: usize) -> String {
    cells.get(index).map(element_text).unwrap_or_default()
}

/// Text of every match of `selector` in `row`, concatenated then trimmed.
/// `None` when nothing matches.
fn joined_text(row: &ElementRef, selector: &Selector) -> Option<String> {
    let mut matches = row.select(selector).peekable();
    matches.peek()?;
    Some(matches.flat_map(|m| m.text()).collect::<String>().trim().to_string())
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_digit_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Accumulator threaded through the row scan.
#[derive(Debug, Default)]
struct ParserState {
    output: Vec<Course>,
    current: Option<Course>,
    stats: ParseStats,
}

impl ParserState {
    /// Applies one row to the state.
    fn apply(mut self, row: Row) -> Self {
        self.stats.rows_seen += 1;

        match row {
            Row::Header(Some(course_code)) => {
                self.stats.header_rows += 1;
                self.flush();
                let subject = course_code
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                self.current = Some(Course {
                    course_code,
                    subject,
                    sections: Vec::new(),
                });
            }
            Row::Section(section) => match self.current.as_mut() {
                Some(course) => {
                    self.stats.section_rows += 1;
                    course.sections.push(section);
                }
                None => self.skip("section row before any course header"),
            },
            Row::Continuation(meeting) => match self.last_section() {
                Some(section) => {
                    section.meetings.push(meeting);
                    self.stats.continuation_rows += 1;
                }
                None => self.skip("continuation row without a section"),
            },
            Row::Notes(notes) => match self.last_section() {
                Some(section) => {
                    section.notes = Some(notes);
                    self.stats.notes_rows += 1;
                }
                None => self.skip("notes row without a section"),
            },
            Row::Header(None) => self.skip("header row without a course code"),
            Row::Unrecognized => self.skip("unrecognized row"),
        }

        self
    }

    /// Moves the in-progress course to the output if it has any sections.
    ///
    /// Courses listed without sections are dropped here.
    fn flush(&mut self) {
        if let Some(course) = self.current.take() {
            if course.sections.is_empty() {
                trace!(course_code = %course.course_code, "Dropping course with no sections");
            } else {
                self.output.push(course);
            }
        }
    }

    fn last_section(&mut self) -> Option<&mut Section> {
        self.current
            .as_mut()
            .and_then(|course| course.sections.last_mut())
    }

    fn skip(&mut self, reason: &str) {
        self.stats.skipped_rows += 1;
        trace!(reason = %reason, "Skipping timetable row");
    }

    /// Flushes the final course and returns the output.
    fn finish(mut self) -> (Vec<Course>, ParseStats) {
        self.flush();
        (self.output, self.stats)
    }
}
