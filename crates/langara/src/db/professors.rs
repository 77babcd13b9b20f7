/// Storage for Rate My Professors ratings, replaced whole on every scrape.
use super::open_connection;
use crate::professors::{Professor, ProfessorQuery};
use rusqlite::{params, Connection, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct ProfessorDbManager {
    db: Mutex<Connection>,
}

/// Wraps `text` for a `LIKE ... ESCAPE '\'` substring match.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl ProfessorDbManager {
    pub fn new(db_path: &str) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(open_connection(db_path)?),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces every stored professor with `professors`.
    pub fn replace_all(&self, professors: &[Professor]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        let deleted = tx.execute("DELETE FROM professors", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO professors (
                    name, department, avg_rating, avg_difficulty, num_ratings,
                    would_take_again_percent, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
            )?;
            for p in professors {
                insert.execute(params![
                    p.name,
                    p.department,
                    p.avg_rating,
                    p.avg_difficulty,
                    p.num_ratings,
                    p.would_take_again_percent
                ])?;
            }
        }

        tx.commit()?;
        info!(deleted, inserted = professors.len(), "Replaced professors");
        Ok(professors.len())
    }

    /// Gets stored professors matching `query`, sorted by its column and
    /// then by name.
    pub fn query(&self, query: &ProfessorQuery) -> Result<Vec<Professor>> {
        let sql = format!(
            "SELECT name, department, avg_rating, avg_difficulty, num_ratings,
                    would_take_again_percent
             FROM professors
             WHERE (?1 IS NULL OR department LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR avg_rating >= ?2)
               AND (?3 IS NULL OR name LIKE ?3 ESCAPE '\\')
             ORDER BY {} {}, name ASC",
            query.sort_by.column(),
            query.sort_order.keyword()
        );

        let db = self.conn();
        let mut stmt = db.prepare(&sql)?;
        let professors = stmt.query_map(
            params![
                query.department.as_deref().map(like_pattern),
                query.min_rating,
                query.name.as_deref().map(like_pattern)
            ],
            |row| {
                Ok(Professor {
                    name: row.get(0)?,
                    department: row.get(1)?,
                    avg_rating: row.get(2)?,
                    avg_difficulty: row.get(3)?,
                    num_ratings: row.get(4)?,
                    would_take_again_percent: row.get(5)?,
                })
            },
        )?;

        professors.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::professors::{ProfessorSort, SortOrder};

    fn professor(name: &str, department: &str, avg_rating: f64) -> Professor {
        Professor {
            name: name.to_string(),
            department: department.to_string(),
            avg_rating,
            avg_difficulty: 3.0,
            num_ratings: 10,
            would_take_again_percent: Some(80.0),
        }
    }

    fn names(professors: Vec<Professor>) -> Vec<String> {
        professors.into_iter().map(|p| p.name).collect()
    }

    fn seeded() -> ProfessorDbManager {
        let db = ProfessorDbManager::new(":memory:").unwrap();
        db.replace_all(&[
            professor("Ada Lovelace", "Computer Science", 4.6),
            professor("Alan Turing", "Computer Science", 3.9),
            professor("Emmy Noether", "Mathematics", 4.8),
            professor("Grace Hopper", "Computing_Lab", 2.5),
        ])
        .unwrap();
        db
    }

    #[test]
    fn test_default_query_sorts_by_rating_descending() {
        let db = seeded();
        assert_eq!(
            names(db.query(&ProfessorQuery::default()).unwrap()),
            ["Emmy Noether", "Ada Lovelace", "Alan Turing", "Grace Hopper"]
        );
    }

    #[test]
    fn test_filters_are_case_insensitive_substrings() {
        let db = seeded();
        let query = ProfessorQuery {
            department: Some("computer".to_string()),
            min_rating: Some(4.0),
            ..ProfessorQuery::default()
        };
        assert_eq!(names(db.query(&query).unwrap()), ["Ada Lovelace"]);

        let query = ProfessorQuery {
            name: Some("TURING".to_string()),
            ..ProfessorQuery::default()
        };
        assert_eq!(names(db.query(&query).unwrap()), ["Alan Turing"]);
    }

    #[test]
    fn test_wildcards_in_filters_match_literally() {
        let db = seeded();
        let query = ProfessorQuery {
            department: Some("_".to_string()),
            ..ProfessorQuery::default()
        };
        assert_eq!(names(db.query(&query).unwrap()), ["Grace Hopper"]);
    }

    #[test]
    fn test_sort_by_name_ascending() {
        let db = seeded();
        let query = ProfessorQuery {
            sort_by: ProfessorSort::Name,
            sort_order: SortOrder::Asc,
            ..ProfessorQuery::default()
        };
        assert_eq!(
            names(db.query(&query).unwrap()),
            ["Ada Lovelace", "Alan Turing", "Emmy Noether", "Grace Hopper"]
        );
    }

    #[test]
    fn test_replace_all_drops_previous_professors() {
        let db = seeded();
        let latest = vec![Professor {
            would_take_again_percent: None,
            ..professor("Barbara Liskov", "Computer Science", 4.9)
        }];
        db.replace_all(&latest).unwrap();
        assert_eq!(db.query(&ProfessorQuery::default()).unwrap(), latest);
    }
}
