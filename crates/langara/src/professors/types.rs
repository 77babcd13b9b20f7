//! GraphQL request and response bodies for ratemyprofessors.com.
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use super::error::ProfessorError;

pub(crate) const SCHOOL_SEARCH_QUERY: &str = "query SchoolSearch($query: SchoolSearchQuery!) {
  newSearch {
    schools(query: $query) {
      edges { node { id name } }
    }
  }
}";

pub(crate) const TEACHER_SEARCH_QUERY: &str =
    "query TeacherSearch($count: Int!, $cursor: String, $query: TeacherSearchQuery!) {
  newSearch {
    teachers(query: $query, first: $count, after: $cursor) {
      edges {
        node {
          firstName
          lastName
          department
          avgRating
          avgDifficulty
          numRatings
          wouldTakeAgainPercent
        }
      }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<V> {
    pub query: &'static str,
    pub variables: V,
}

#[derive(Debug, Serialize)]
pub struct SchoolSearchVariables {
    pub query: SchoolSearchText,
}

#[derive(Debug, Serialize)]
pub struct SchoolSearchText {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TeacherSearchVariables {
    pub count: u32,
    pub cursor: Option<String>,
    pub query: TeacherSearchText,
}

#[derive(Debug, Serialize)]
pub struct TeacherSearchText {
    pub text: String,
    #[serde(rename = "schoolID")]
    pub school_id: String,
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

impl<T> GraphQlResponse<T> {
    /// Takes the data, or turns the reported errors into one error.
    pub fn into_data(self) -> Result<T, ProfessorError> {
        match self.data {
            Some(data) => Ok(data),
            None if self.errors.is_empty() => Err(ProfessorError::UnexpectedResponse {
                message: "Response carried neither data nor errors".to_string(),
            }),
            None => Err(ProfessorError::GraphQl {
                message: self
                    .errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData<T> {
    pub new_search: T,
}

#[derive(Debug, Deserialize)]
pub struct SchoolResults {
    pub schools: Connection<SchoolNode>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherResults {
    pub teachers: Connection<TeacherNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<N> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<N>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct Edge<N> {
    pub node: N,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SchoolNode {
    /// Opaque GraphQL id, the one teacher searches filter on
    pub id: String,
    pub name: String,
}

/// Rating fields are null for teachers nobody has rated yet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherNode {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_difficulty: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_ratings: u32,
    /// -1 when there are no answers
    #[serde(default)]
    pub would_take_again_percent: Option<f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Parses a GraphQL response body down to its `data`.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ProfessorError> {
    let response: GraphQlResponse<T> =
        serde_json::from_str(body).map_err(|e| ProfessorError::UnexpectedResponse {
            message: e.to_string(),
        })?;
    response.into_data()
}
