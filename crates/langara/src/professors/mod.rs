/// Rate My Professors module
///
/// Ratings come from the site's public GraphQL endpoint: the configured
/// school name is resolved to a school id, then every teacher at that school
/// is paged through with a cursor.
pub mod client;
mod error;
mod types;

pub use error::ProfessorError;

use serde::{Deserialize, Serialize};
use types::{SchoolNode, TeacherNode};

/// A rated instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professor {
    pub name: String,
    pub department: String,
    pub avg_rating: f64,
    pub avg_difficulty: f64,
    pub num_ratings: u32,
    /// `None` when nobody has answered the question
    pub would_take_again_percent: Option<f64>,
}

impl From<TeacherNode> for Professor {
    fn from(node: TeacherNode) -> Self {
        let name = format!("{} {}", node.first_name.trim(), node.last_name.trim());
        Self {
            name: name.trim().to_string(),
            department: node.department.trim().to_string(),
            avg_rating: node.avg_rating,
            avg_difficulty: node.avg_difficulty,
            num_ratings: node.num_ratings,
            would_take_again_percent: node.would_take_again_percent.filter(|p| *p >= 0.0),
        }
    }
}

/// Column `GET /professors` sorts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessorSort {
    Name,
    Department,
    #[default]
    AvgRating,
    AvgDifficulty,
    NumRatings,
    WouldTakeAgainPercent,
}

impl ProfessorSort {
    pub fn column(self) -> &'static str {
        match self {
            ProfessorSort::Name => "name",
            ProfessorSort::Department => "department",
            ProfessorSort::AvgRating => "avg_rating",
            ProfessorSort::AvgDifficulty => "avg_difficulty",
            ProfessorSort::NumRatings => "num_ratings",
            ProfessorSort::WouldTakeAgainPercent => "would_take_again_percent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters for stored professors. Text filters are case-insensitive
/// substring matches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProfessorQuery {
    pub department: Option<String>,
    pub min_rating: Option<f64>,
    pub name: Option<String>,
    pub sort_by: ProfessorSort,
    pub sort_order: SortOrder,
}

/// Picks the search result whose name matches `name`, falling back to the
/// first result.
fn pick_school(schools: Vec<SchoolNode>, name: &str) -> Option<SchoolNode> {
    let exact = schools
        .iter()
        .position(|school| school.name.trim().eq_ignore_ascii_case(name.trim()));
    let index = exact.unwrap_or(0);
    schools.into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::types::{decode, SearchData, TeacherResults};
    use super::*;

    fn school(id: &str, name: &str) -> SchoolNode {
        SchoolNode {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_teacher_page_decodes_into_professors() {
        let body = r#"{
            "data": { "newSearch": { "teachers": {
                "edges": [
                    { "node": {
                        "firstName": "Ada ", "lastName": "Lovelace",
                        "department": "Computer Science",
                        "avgRating": 4.6, "avgDifficulty": 3.1, "numRatings": 42,
                        "wouldTakeAgainPercent": 91.5
                    } },
                    { "node": {
                        "firstName": "Alan", "lastName": "Turing",
                        "department": null,
                        "avgRating": null, "avgDifficulty": 0, "numRatings": 0,
                        "wouldTakeAgainPercent": -1
                    } }
                ],
                "pageInfo": { "hasNextPage": true, "endCursor": "YXJyYXk=" }
            } } }
        }"#;

        let data: SearchData<TeacherResults> = decode(body).unwrap();
        let page = data.new_search.teachers;
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("YXJyYXk="));

        let professors: Vec<Professor> =
            page.edges.into_iter().map(|e| Professor::from(e.node)).collect();
        assert_eq!(
            professors[0],
            Professor {
                name: "Ada Lovelace".to_string(),
                department: "Computer Science".to_string(),
                avg_rating: 4.6,
                avg_difficulty: 3.1,
                num_ratings: 42,
                would_take_again_percent: Some(91.5),
            }
        );
        assert_eq!(professors[1].department, "");
        assert_eq!(professors[1].avg_rating, 0.0);
        assert_eq!(professors[1].would_take_again_percent, None);
    }

    #[test]
    fn test_graphql_errors_without_data() {
        let body = r#"{ "data": null, "errors": [{ "message": "bad query" }] }"#;
        let err = decode::<SearchData<TeacherResults>>(body).unwrap_err();
        assert!(matches!(err, ProfessorError::GraphQl { message } if message == "bad query"));
    }

    #[test]
    fn test_pick_school_prefers_exact_name() {
        let schools = vec![
            school("U2Nob29sLTE=", "Langara College Continuing Studies"),
            school("U2Nob29sLTI=", "langara college"),
        ];
        assert_eq!(pick_school(schools, "Langara College").unwrap().id, "U2Nob29sLTI=");

        let fallback = vec![school("U2Nob29sLTE=", "Langara College Continuing Studies")];
        assert_eq!(pick_school(fallback, "Langara College").unwrap().id, "U2Nob29sLTE=");
        assert!(pick_school(Vec::new(), "Langara College").is_none());
    }

    #[test]
    fn test_query_defaults_sort_by_rating_descending() {
        let query: ProfessorQuery =
            serde_json::from_str(r#"{ "department": "math", "min_rating": 4 }"#).unwrap();
        assert_eq!(query.sort_by, ProfessorSort::AvgRating);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.min_rating, Some(4.0));
        assert_eq!(query.name, None);
    }
}
