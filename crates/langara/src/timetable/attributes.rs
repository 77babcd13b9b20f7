//! Parsing of the course attribute table.
//!
//! Each row is a course code followed by one cell per attribute, holding `Y`
//! when the course carries that attribute.

use super::{CourseAttribute, COURSE_CODE_REGEX};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Attribute codes in column order.
pub const ATTRIBUTE_CODES: [&str; 7] = ["2AR", "2SC", "HUM", "LSC", "SCI", "SOC", "UT"];

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());
static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Parses the attribute table into one entry per course row.
pub fn parse_attributes(html: &str) -> Vec<CourseAttribute> {
    let document = Html::parse_document(html);
    let mut course_attributes = Vec::new();

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        let Some(course_code) = cells.first().map(cell_text) else {
            continue;
        };

        if !COURSE_CODE_REGEX.is_match(&course_code) || cells.len() < ATTRIBUTE_CODES.len() + 1 {
            continue;
        }

        let attributes = ATTRIBUTE_CODES
            .iter()
            .enumerate()
            .filter(|(i, _)| cells.get(i + 1).map(cell_text).as_deref() == Some("Y"))
            .map(|(_, code)| code.to_string())
            .collect();

        course_attributes.push(CourseAttribute {
            course_code,
            attributes,
        });
    }

    debug!(count = course_attributes.len(), "Parsed course attributes");
    course_attributes
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, flags: [&str; 7]) -> String {
        let cells: String = flags.iter().map(|f| format!("<td>{f}</td>")).collect();
        format!("<tr><td>{code}</td>{cells}</tr>")
    }

    #[test]
    fn test_parse_attributes() {
        let html = format!(
            "<table><tr><th>Course</th><th>2AR</th></tr>{}{}</table>",
            row("ENGL 1123", ["", "", "Y", "", "", "", "Y"]),
            row("CHEM 1120", ["", "Y", "", "Y", "Y", "", "Y"]),
        );

        let attributes = parse_attributes(&html);
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].course_code, "ENGL 1123");
        assert_eq!(attributes[0].attributes, vec!["HUM", "UT"]);
        assert_eq!(attributes[1].attributes, vec!["2SC", "LSC", "SCI", "UT"]);
    }

    #[test]
    fn test_rows_without_course_code_are_skipped() {
        let html = format!(
            "<table>{}<tr><td>ENGL 1123</td><td>Y</td></tr>{}</table>",
            row("Legend", ["Y"; 7]),
            row("PHIL 1100", [""; 7]),
        );

        let attributes = parse_attributes(&html);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].course_code, "PHIL 1100");
        assert!(attributes[0].attributes.is_empty());
    }
}
