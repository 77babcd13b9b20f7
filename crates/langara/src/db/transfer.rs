/// Storage for transfer agreements.
///
/// Each agreement is stored whole as JSON. Sending courses go into a side
/// table so a bundle can be found from either of its two courses.
use super::{from_sql_error, open_connection, to_sql_error};
use crate::transfer::TransferAgreement;
use rusqlite::{params, Connection, Result};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct TransferDbManager {
    db: Mutex<Connection>,
}

/// Subject and course number pairs an agreement is sent from
fn sending_courses(agreement: &TransferAgreement) -> Vec<(&str, &str)> {
    match agreement {
        TransferAgreement::Single(a) => {
            vec![(a.sending_subject.as_str(), a.sending_course_number.as_str())]
        }
        TransferAgreement::Bundle(a) => a
            .sending_subject
            .iter()
            .zip(a.sending_course_number.iter())
            .map(|(subject, number)| (subject.as_str(), number.as_str()))
            .collect(),
    }
}

fn kind(agreement: &TransferAgreement) -> &'static str {
    match agreement {
        TransferAgreement::Single(_) => "single",
        TransferAgreement::Bundle(_) => "bundle",
    }
}

impl TransferDbManager {
    pub fn new(db_path: &str) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(open_connection(db_path)?),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces every stored agreement with `agreements`.
    pub fn replace_all(&self, agreements: &[TransferAgreement]) -> Result<usize> {
        let mut db = self.conn();
        let tx = db.transaction()?;

        tx.execute("DELETE FROM transfer_sending_courses", [])?;
        let deleted = tx.execute("DELETE FROM transfer_agreements", [])?;

        for agreement in agreements {
            let payload = serde_json::to_string(agreement).map_err(to_sql_error)?;
            tx.execute(
                "INSERT INTO transfer_agreements (
                    kind, sending_institution_code, receiving_institution_code,
                    start_date, end_date, payload, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
                params![
                    kind(agreement),
                    agreement.sending_institution_code(),
                    agreement.receiving_institution_code(),
                    agreement.start_date(),
                    agreement.end_date(),
                    payload
                ],
            )?;
            let agreement_id = tx.last_insert_rowid();

            for (subject, number) in sending_courses(agreement) {
                tx.execute(
                    "INSERT INTO transfer_sending_courses (agreement_id, subject, course_number)
                     VALUES (?1, ?2, ?3)",
                    params![agreement_id, subject, number],
                )?;
            }
        }

        tx.commit()?;
        info!(
            deleted,
            inserted = agreements.len(),
            "Replaced transfer agreements"
        );
        Ok(agreements.len())
    }

    /// Gets agreements that send `subject number`, optionally only those
    /// received by one institution.
    pub fn get_transfers_for_course(
        &self,
        subject: &str,
        course_number: &str,
        receiving_institution: Option<&str>,
    ) -> Result<Vec<TransferAgreement>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT DISTINCT a.agreement_id, a.payload
             FROM transfer_agreements a
             JOIN transfer_sending_courses c ON c.agreement_id = a.agreement_id
             WHERE c.subject = ?1 AND c.course_number = ?2
               AND (?3 IS NULL OR a.receiving_institution_code = ?3)
             ORDER BY a.agreement_id",
        )?;

        let agreements = stmt.query_map(
            params![subject, course_number, receiving_institution],
            |row| {
                let payload: String = row.get(1)?;
                serde_json::from_str(&payload).map_err(|e| from_sql_error(1, e))
            },
        )?;

        agreements.collect()
    }

    pub fn count(&self) -> Result<usize> {
        let db = self.conn();
        let count: i64 =
            db.query_row("SELECT COUNT(*) FROM transfer_agreements", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::process_agreement;
    use crate::transfer::tests::raw;

    fn agreement(detail: &str, receiving: &str) -> TransferAgreement {
        let mut raw = raw(detail);
        raw.receiving_institution_code = receiving.to_string();
        process_agreement(&raw, "1050", "CPSC", "LANG").unwrap()
    }

    #[test]
    fn test_replace_and_query_by_course() {
        let db = TransferDbManager::new(":memory:").unwrap();
        let agreements = vec![
            agreement("SFU CMPT 120 (3)", "SFU"),
            agreement("UBCV CPSC 110 (4)", "UBCV"),
            agreement("No credit", "UVIC"),
        ];

        assert_eq!(db.replace_all(&agreements).unwrap(), 3);
        assert_eq!(db.get_transfers_for_course("CPSC", "1050", None).unwrap(), agreements);

        let sfu = db.get_transfers_for_course("CPSC", "1050", Some("SFU")).unwrap();
        assert_eq!(sfu, vec![agreements[0].clone()]);
        assert!(db.get_transfers_for_course("CPSC", "1150", None).unwrap().is_empty());
    }

    #[test]
    fn test_bundle_found_from_either_course() {
        let db = TransferDbManager::new(":memory:").unwrap();
        let bundle = agreement(
            "BIOL 1115 (4) & BIOL 1215 (4) = BIOL 1XX (3) & BIOL 121 (3)",
            "UBCV",
        );
        db.replace_all(std::slice::from_ref(&bundle)).unwrap();

        assert_eq!(
            db.get_transfers_for_course("BIOL", "1115", None).unwrap(),
            vec![bundle.clone()]
        );
        assert_eq!(
            db.get_transfers_for_course("BIOL", "1215", None).unwrap(),
            vec![bundle]
        );
    }

    #[test]
    fn test_replace_all_removes_previous_snapshot() {
        let db = TransferDbManager::new(":memory:").unwrap();
        db.replace_all(&[
            agreement("SFU CMPT 120 (3)", "SFU"),
            agreement("UBCV CPSC 110 (4)", "UBCV"),
        ])
        .unwrap();

        let latest = vec![agreement("SFU CMPT 125 (3)", "SFU")];
        db.replace_all(&latest).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        assert_eq!(db.get_transfers_for_course("CPSC", "1050", None).unwrap(), latest);
    }

    #[test]
    fn test_replace_all_drops_other_sending_institutions() {
        let db = TransferDbManager::new(":memory:").unwrap();
        db.replace_all(&[agreement("SFU CMPT 120 (3)", "SFU")]).unwrap();

        let mut raw = raw("UBCV CPSC 110 (4)");
        raw.receiving_institution_code = "UBCV".to_string();
        let other = process_agreement(&raw, "1110", "CPSC", "DOUG").unwrap();
        db.replace_all(std::slice::from_ref(&other)).unwrap();

        assert_eq!(db.count().unwrap(), 1);
        assert!(db.get_transfers_for_course("CPSC", "1050", None).unwrap().is_empty());
        assert_eq!(db.get_transfers_for_course("CPSC", "1110", None).unwrap(), vec![other]);
    }
}
