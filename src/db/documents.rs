use rusqlite::{params, OptionalExtension};

use super::*;

/// Which outgoing document a record is. Pro formas and issued invoices share
/// one table and are numbered independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentKind {
    Proforma,
    Invoice,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Proforma => "proforma",
            DocumentKind::Invoice => "invoice",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "proforma" => Some(DocumentKind::Proforma),
            "invoice" => Some(DocumentKind::Invoice),
            _ => None,
        }
    }
}

impl ArchiveDb {
    // =========================================================================
    // Outgoing documents (pro formas, issued invoices)
    // =========================================================================

    /// Upsert by (kind, document_number) so re-saving a draft updates the
    /// existing record. Returns the row id.
    pub fn save_document(&self, kind: DocumentKind, input: &DocumentInput) -> Result<i64, String> {
        let items = if input.items.is_null() {
            "[]".to_string()
        } else {
            input.items.to_string()
        };
        let status = input.status.as_deref().unwrap_or("UNPAID");

        self.conn
            .execute(
                "INSERT INTO business_documents (
                    kind, document_number, document_date, expiry_date, reference,
                    bill_to, ship_to, items, tax_rate, shipping, subtotal, total,
                    notes, status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(kind, document_number) DO UPDATE SET
                    document_date = excluded.document_date,
                    expiry_date = excluded.expiry_date,
                    reference = excluded.reference,
                    bill_to = excluded.bill_to,
                    ship_to = excluded.ship_to,
                    items = excluded.items,
                    tax_rate = excluded.tax_rate,
                    shipping = excluded.shipping,
                    subtotal = excluded.subtotal,
                    total = excluded.total,
                    notes = excluded.notes,
                    status = excluded.status,
                    updated_at = ?15",
                params![
                    kind.as_str(),
                    input.document_number,
                    input.document_date,
                    input.expiry_date,
                    input.reference,
                    input.bill_to,
                    input.ship_to,
                    items,
                    input.tax_rate,
                    input.shipping,
                    input.subtotal,
                    input.total,
                    input.notes,
                    status,
                    now_string(),
                ],
            )
            .map_err(|e| format!("Failed to save {} {}: {e}", kind.as_str(), input.document_number))?;

        // last_insert_rowid is stale after a conflict update; look the id up
        self.conn
            .query_row(
                "SELECT id FROM business_documents WHERE kind = ?1 AND document_number = ?2",
                params![kind.as_str(), input.document_number],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to read back {} {}: {e}", kind.as_str(), input.document_number))
    }

    pub fn list_documents(&self, kind: DocumentKind) -> Result<Vec<DocumentSummary>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, document_number, document_date, expiry_date, bill_to, total, status,
                        created_at
                 FROM business_documents WHERE kind = ?1 ORDER BY created_at DESC, id DESC",
            )
            .map_err(|e| format!("Failed to prepare document listing: {e}"))?;

        let rows = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok(DocumentSummary {
                    id: row.get(0)?,
                    document_number: row.get(1)?,
                    document_date: row.get(2)?,
                    expiry_date: row.get(3)?,
                    bill_to: row.get(4)?,
                    total: row.get(5)?,
                    status: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })
            .map_err(|e| format!("Failed to query documents: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read document row: {e}"))?);
        }
        Ok(results)
    }

    pub fn get_document(
        &self,
        kind: DocumentKind,
        id: i64,
    ) -> Result<Option<BusinessDocument>, String> {
        self.conn
            .query_row(
                "SELECT id, document_number, document_date, expiry_date, reference, bill_to,
                        ship_to, items, tax_rate, shipping, subtotal, total, notes, status,
                        created_at, updated_at
                 FROM business_documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| {
                    let items: String = row.get(7)?;
                    Ok(BusinessDocument {
                        id: row.get(0)?,
                        document_number: row.get(1)?,
                        document_date: row.get(2)?,
                        expiry_date: row.get(3)?,
                        reference: row.get(4)?,
                        bill_to: row.get(5)?,
                        ship_to: row.get(6)?,
                        items: serde_json::from_str(&items)
                            .unwrap_or_else(|_| serde_json::Value::Array(Vec::new())),
                        tax_rate: row.get(8)?,
                        shipping: row.get(9)?,
                        subtotal: row.get(10)?,
                        total: row.get(11)?,
                        notes: row.get(12)?,
                        status: row.get(13)?,
                        created_at: row.get(14)?,
                        updated_at: row.get(15)?,
                    })
                },
            )
            .optional()
            .map_err(|e| format!("Failed to fetch {} {id}: {e}", kind.as_str()))
    }

    pub fn set_document_status(
        &self,
        kind: DocumentKind,
        id: i64,
        status: &str,
    ) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE business_documents SET status = ?1, updated_at = ?2
                 WHERE kind = ?3 AND id = ?4",
                params![status, now_string(), kind.as_str(), id],
            )
            .map_err(|e| format!("Failed to update status for {} {id}: {e}", kind.as_str()))?;
        Ok(changed > 0)
    }

    pub fn delete_document(&self, kind: DocumentKind, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM business_documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
            )
            .map_err(|e| format!("Failed to delete {} {id}: {e}", kind.as_str()))?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;
    use serde_json::json;

    fn input(number: &str) -> DocumentInput {
        DocumentInput {
            document_number: number.to_string(),
            document_date: Some("2025-06-01".to_string()),
            bill_to: Some("Acme Labels SRL".to_string()),
            items: json!([{ "description": "Thermal rolls 80mm", "qty": 100, "price": 1.5 }]),
            subtotal: 150.0,
            total: 150.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_resave_updates_in_place() {
        let db = test_db();
        let first = db
            .save_document(DocumentKind::Proforma, &input("PF-001"))
            .expect("save");

        let mut updated = input("PF-001");
        updated.total = 200.0;
        updated.status = Some("PAID".to_string());
        let second = db
            .save_document(DocumentKind::Proforma, &updated)
            .expect("resave");

        assert_eq!(first, second, "same number keeps the same row");
        let documents = db.list_documents(DocumentKind::Proforma).expect("list");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].total, 200.0);
        assert_eq!(documents[0].status, "PAID");
    }

    #[test]
    fn test_kinds_are_numbered_independently() {
        let db = test_db();
        let proforma = db
            .save_document(DocumentKind::Proforma, &input("DOC-1"))
            .expect("proforma");
        let invoice = db
            .save_document(DocumentKind::Invoice, &input("DOC-1"))
            .expect("invoice");
        assert_ne!(proforma, invoice);

        assert_eq!(db.list_documents(DocumentKind::Proforma).expect("list").len(), 1);
        assert_eq!(db.list_documents(DocumentKind::Invoice).expect("list").len(), 1);
    }

    #[test]
    fn test_items_round_trip_as_json() {
        let db = test_db();
        let id = db
            .save_document(DocumentKind::Invoice, &input("INV-7"))
            .expect("save");

        let document = db
            .get_document(DocumentKind::Invoice, id)
            .expect("fetch")
            .expect("present");
        assert_eq!(document.items[0]["description"], "Thermal rolls 80mm");
        assert_eq!(document.status, "UNPAID");
    }

    #[test]
    fn test_status_and_delete_scoped_by_kind() {
        let db = test_db();
        let id = db
            .save_document(DocumentKind::Proforma, &input("PF-9"))
            .expect("save");

        // The wrong kind must not touch the row
        assert!(!db
            .set_document_status(DocumentKind::Invoice, id, "PAID")
            .expect("status"));
        assert!(db
            .set_document_status(DocumentKind::Proforma, id, "PAID")
            .expect("status"));

        assert!(!db.delete_document(DocumentKind::Invoice, id).expect("delete"));
        assert!(db.delete_document(DocumentKind::Proforma, id).expect("delete"));
        assert!(db
            .get_document(DocumentKind::Proforma, id)
            .expect("fetch")
            .is_none());
    }
}
