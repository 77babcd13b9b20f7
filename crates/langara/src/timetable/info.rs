/// Course descriptions and attribute merging
use super::{CourseAttribute, CourseDescription, CourseInfo, COURSE_CODE_REGEX};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"table.dataentrytable tr td[colspan="19"].dedefault b"#).unwrap()
});
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static DESCRIPTION_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".field--name-field-description .field__item").unwrap()
});

/// Extracts every course code listed in a timetable, including courses that
/// have no sections this term.
pub fn parse_course_codes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&HEADER_SELECTOR)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|code| COURSE_CODE_REGEX.is_match(code))
        .collect()
}

/// Parses a course's public page into its title and description.
pub fn parse_course_description(course_code: &str, html: &str) -> CourseDescription {
    let document = Html::parse_document(html);

    let text_of = |selector: &Selector| {
        let text: String = document
            .select(selector)
            .map(|el| el.text().collect::<String>())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    };

    CourseDescription {
        course_code: course_code.to_string(),
        title: text_of(&TITLE_SELECTOR),
        description: text_of(&DESCRIPTION_SELECTOR),
    }
}

/// Merges descriptions with attributes, keeping the order of `descriptions`.
///
/// Courses absent from the attribute table get an empty attribute list.
pub fn merge_course_info(
    descriptions: Vec<CourseDescription>,
    attributes: Vec<CourseAttribute>,
) -> Vec<CourseInfo> {
    let by_code: HashMap<String, Vec<String>> = attributes
        .into_iter()
        .map(|a| (a.course_code, a.attributes))
        .collect();

    descriptions
        .into_iter()
        .map(|desc| CourseInfo {
            attributes: by_code.get(&desc.course_code).cloned().unwrap_or_default(),
            course_code: desc.course_code,
            title: desc.title,
            description: desc.description,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::tests::{document, header_row, section_row};

    #[test]
    fn test_parse_course_codes_includes_unoffered_courses() {
        let html = document(&[
            header_row("ABST 1100"),
            header_row("CPSC 1050"),
            section_row("12345", "1050", "001", "Lecture"),
            header_row("Subject Listing"),
        ]);

        assert_eq!(parse_course_codes(&html), vec!["ABST 1100", "CPSC 1050"]);
    }

    #[test]
    fn test_parse_course_description() {
        let html = r#"
            <html><body>
              <h1> Introduction to Computer Science </h1>
              <div class="field--name-field-description">
                <div class="field__item">Covers algorithms and programming.</div>
              </div>
            </body></html>"#;

        let desc = parse_course_description("CPSC 1050", html);
        assert_eq!(desc.title.as_deref(), Some("Introduction to Computer Science"));
        assert_eq!(
            desc.description.as_deref(),
            Some("Covers algorithms and programming.")
        );

        let empty = parse_course_description("CPSC 1050", "<html></html>");
        assert_eq!(empty.title, None);
        assert_eq!(empty.description, None);
    }

    #[test]
    fn test_merge_course_info() {
        let descriptions = vec![
            CourseDescription {
                course_code: "ENGL 1123".to_string(),
                title: Some("Intro to Academic Writing".to_string()),
                description: None,
            },
            CourseDescription {
                course_code: "CPSC 1050".to_string(),
                title: None,
                description: None,
            },
        ];
        let attributes = vec![CourseAttribute {
            course_code: "ENGL 1123".to_string(),
            attributes: vec!["HUM".to_string(), "UT".to_string()],
        }];

        let merged = merge_course_info(descriptions, attributes);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].attributes, vec!["HUM", "UT"]);
        assert!(merged[1].attributes.is_empty());
        assert_eq!(merged[1].course_code, "CPSC 1050");
    }

    #[test]
    fn test_repeated_course_code_keeps_attributes() {
        let description = CourseDescription {
            course_code: "ENGL 1123".to_string(),
            title: None,
            description: None,
        };
        let attributes = vec![CourseAttribute {
            course_code: "ENGL 1123".to_string(),
            attributes: vec!["HUM".to_string()],
        }];

        let merged = merge_course_info(vec![description.clone(), description], attributes);
        assert_eq!(merged[0].attributes, vec!["HUM"]);
        assert_eq!(merged[1].attributes, vec!["HUM"]);
    }
}
