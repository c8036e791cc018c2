use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // Parsed invoices
    // =========================================================================

    /// Store parser output for an attachment. One invoice row per attachment;
    /// a re-parse of an already-stored attachment is ignored so manual edits
    /// survive re-downloads.
    pub fn store_parsed_invoice(
        &self,
        attachment_id: i64,
        email_id: i64,
        parsed: &ParsedInvoice,
        raw_text: &str,
    ) -> Result<Option<i64>, String> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO parsed_invoices (
                    attachment_id, email_id, invoice_number, invoice_date,
                    amount, currency, vendor, raw_text
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    attachment_id,
                    email_id,
                    parsed.invoice_number,
                    parsed.invoice_date,
                    parsed.amount,
                    parsed.currency,
                    parsed.vendor,
                    raw_text,
                ],
            )
            .map_err(|e| format!("Failed to store invoice for attachment {attachment_id}: {e}"))?;

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    pub fn get_invoice(&self, id: i64) -> Result<Option<DbInvoice>, String> {
        self.conn
            .query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM parsed_invoices WHERE id = ?1"),
                params![id],
                map_invoice_row,
            )
            .optional()
            .map_err(|e| format!("Failed to fetch invoice {id}: {e}"))
    }

    /// Joined listing: invoices with their attachment and source email.
    pub fn list_invoices(&self, include_hidden: bool) -> Result<Vec<InvoiceListing>, String> {
        let mut sql = format!(
            "SELECT {}, a.filename, a.file_path, e.subject, e.from_address, e.date_received
             FROM parsed_invoices i
             LEFT JOIN attachments a ON a.id = i.attachment_id
             LEFT JOIN emails e ON e.id = i.email_id",
            INVOICE_COLUMNS_PREFIXED
        );
        if !include_hidden {
            sql.push_str(" WHERE i.hidden = 0");
        }
        sql.push_str(" ORDER BY i.invoice_date DESC, i.id DESC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| format!("Failed to prepare invoice listing: {e}"))?;

        let rows = stmt
            .query_map([], map_listing_row)
            .map_err(|e| format!("Failed to query invoices: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read invoice row: {e}"))?);
        }
        Ok(results)
    }

    /// Invoices for a dashboard tab: rows explicitly assigned to the tab, plus
    /// unassigned rows whose vendor matches the tab name.
    pub fn invoices_for_tab(&self, tab: &str) -> Result<Vec<InvoiceListing>, String> {
        let pattern = like_pattern(tab);
        let sql = format!(
            "SELECT {}, a.filename, a.file_path, e.subject, e.from_address, e.date_received
             FROM parsed_invoices i
             LEFT JOIN attachments a ON a.id = i.attachment_id
             LEFT JOIN emails e ON e.id = i.email_id
             WHERE i.hidden = 0
               AND (i.assigned_tab = ?1 OR (i.assigned_tab IS NULL AND i.vendor LIKE ?2))
             ORDER BY i.invoice_date DESC, i.id DESC",
            INVOICE_COLUMNS_PREFIXED
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| format!("Failed to prepare tab listing: {e}"))?;

        let rows = stmt
            .query_map(params![tab, pattern], map_listing_row)
            .map_err(|e| format!("Failed to query tab invoices: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read invoice row: {e}"))?);
        }
        Ok(results)
    }

    /// Manual amount correction. Flags the row so re-parses never clobber it.
    pub fn update_invoice_amount(&self, id: i64, amount: f64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE parsed_invoices SET amount = ?1, amount_edited = 1 WHERE id = ?2",
                params![amount, id],
            )
            .map_err(|e| format!("Failed to update invoice amount for {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn update_invoice_number(&self, id: i64, number: &str) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE parsed_invoices SET invoice_number = ?1 WHERE id = ?2",
                params![number, id],
            )
            .map_err(|e| format!("Failed to update invoice number for {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn set_invoice_hidden(&self, id: i64, hidden: bool) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE parsed_invoices SET hidden = ?1 WHERE id = ?2",
                params![hidden as i32, id],
            )
            .map_err(|e| format!("Failed to set hidden flag for {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn assign_invoice_tab(&self, id: i64, tab: Option<&str>) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE parsed_invoices SET assigned_tab = ?1 WHERE id = ?2",
                params![tab, id],
            )
            .map_err(|e| format!("Failed to assign tab for {id}: {e}"))?;
        Ok(changed > 0)
    }

    /// Extracted text stored with an invoice, if any.
    pub fn invoice_raw_text(&self, id: i64) -> Result<Option<String>, String> {
        let text: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT raw_text FROM parsed_invoices WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to read invoice text for {id}: {e}"))?;
        Ok(text.flatten())
    }

    /// All (id, document) pairs for the invoice semantic collection.
    /// The document is the extracted text, falling back to parsed fields.
    pub fn invoice_documents(&self) -> Result<Vec<(i64, String)>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, COALESCE(raw_text, ''), COALESCE(vendor, ''),
                        COALESCE(invoice_number, '')
                 FROM parsed_invoices",
            )
            .map_err(|e| format!("Failed to prepare invoice documents query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let raw: String = row.get(1)?;
                let vendor: String = row.get(2)?;
                let number: String = row.get(3)?;
                Ok((id, raw, vendor, number))
            })
            .map_err(|e| format!("Failed to query invoice documents: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, raw, vendor, number) =
                row.map_err(|e| format!("Failed to read invoice document: {e}"))?;
            let doc = if raw.trim().is_empty() {
                format!("{} {}", vendor, number).trim().to_string()
            } else {
                raw
            };
            if !doc.is_empty() {
                results.push((id, doc));
            }
        }
        Ok(results)
    }

    /// Latest orders for the timeline view, derived from parsed invoices that
    /// carry an invoice number. RON amounts are converted to EUR.
    pub fn email_orders(&self, limit: i64) -> Result<Vec<EmailOrder>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT i.id, i.invoice_number, i.invoice_date, i.amount, i.currency,
                        e.from_address, e.date_received
                 FROM parsed_invoices i
                 JOIN emails e ON e.id = i.email_id
                 WHERE i.invoice_number IS NOT NULL AND i.invoice_number != ''
                   AND i.hidden = 0
                 ORDER BY e.date_received DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare orders query: {e}"))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                let id: i64 = row.get(0)?;
                let order_number: String = row.get(1)?;
                let invoice_date: Option<String> = row.get(2)?;
                let amount: Option<f64> = row.get(3)?;
                let currency: Option<String> = row.get(4)?;
                let customer: Option<String> = row.get(5)?;
                let date_received: Option<String> = row.get(6)?;
                Ok((id, order_number, invoice_date, amount, currency, customer, date_received))
            })
            .map_err(|e| format!("Failed to query orders: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, order_number, invoice_date, mut amount, currency, customer, date_received) =
                row.map_err(|e| format!("Failed to read order row: {e}"))?;
            if currency.as_deref() == Some("RON") {
                amount = amount.map(|a| a / RON_TO_EUR);
            }
            let date = date_received
                .map(|d| d.chars().take(10).collect::<String>())
                .or(invoice_date);
            let customer = customer.map(|c| c.chars().take(30).collect::<String>());
            results.push(EmailOrder {
                id,
                order_number,
                date,
                amount,
                customer,
            });
        }
        Ok(results)
    }

    /// Emails whose subject suggests an invoice but which carry no parsed row.
    /// Shown alongside parsed invoices so nothing slips through.
    pub fn invoice_like_emails(&self, limit: i64) -> Result<Vec<EmailSummary>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.id, e.subject, e.from_address, e.to_address, e.date_received, e.folder,
                        COALESCE(r.is_read, 0),
                        (SELECT COUNT(*) FROM attachments a WHERE a.email_id = e.id)
                 FROM emails e
                 LEFT JOIN email_read_status r ON r.email_id = e.id
                 WHERE (e.subject LIKE '%invoice%' OR e.subject LIKE '%factura%')
                   AND e.id NOT IN (SELECT email_id FROM parsed_invoices WHERE email_id IS NOT NULL)
                 ORDER BY e.date_received DESC
                 LIMIT ?1",
            )
            .map_err(|e| format!("Failed to prepare invoice-email query: {e}"))?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(EmailSummary {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    from_address: row.get(2)?,
                    to_address: row.get(3)?,
                    date_received: row.get(4)?,
                    folder: row.get(5)?,
                    is_read: row.get::<_, i32>(6)? != 0,
                    attachment_count: row.get(7)?,
                })
            })
            .map_err(|e| format!("Failed to query invoice-like emails: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read email row: {e}"))?);
        }
        Ok(results)
    }
}

/// Fixed RON/EUR rate used for the order timeline.
const RON_TO_EUR: f64 = 4.97;

const INVOICE_COLUMNS: &str = "id, attachment_id, email_id, invoice_number, invoice_date, \
     amount, currency, vendor, hidden, assigned_tab, amount_edited, created_at";

const INVOICE_COLUMNS_PREFIXED: &str =
    "i.id, i.attachment_id, i.email_id, i.invoice_number, i.invoice_date, \
     i.amount, i.currency, i.vendor, i.hidden, i.assigned_tab, i.amount_edited, i.created_at";

fn map_invoice_row(row: &rusqlite::Row) -> rusqlite::Result<DbInvoice> {
    Ok(DbInvoice {
        id: row.get(0)?,
        attachment_id: row.get(1)?,
        email_id: row.get(2)?,
        invoice_number: row.get(3)?,
        invoice_date: row.get(4)?,
        amount: row.get(5)?,
        currency: row.get(6)?,
        vendor: row.get(7)?,
        hidden: row.get::<_, i32>(8)? != 0,
        assigned_tab: row.get(9)?,
        amount_edited: row.get::<_, i32>(10)? != 0,
        created_at: row.get(11)?,
    })
}

fn map_listing_row(row: &rusqlite::Row) -> rusqlite::Result<InvoiceListing> {
    Ok(InvoiceListing {
        invoice: map_invoice_row(row)?,
        filename: row.get(12)?,
        file_path: row.get(13)?,
        email_subject: row.get(14)?,
        email_from: row.get(15)?,
        email_date: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn parsed() -> ParsedInvoice {
        ParsedInvoice {
            invoice_number: Some("FCT-00042".to_string()),
            invoice_date: Some("2025-06-01".to_string()),
            amount: Some(1234.56),
            currency: Some("EUR".to_string()),
            vendor: Some("Acme Labels SRL".to_string()),
        }
    }

    #[test]
    fn test_one_invoice_row_per_attachment() {
        let db = test_db();
        let first = db
            .store_parsed_invoice(7, 3, &parsed(), "raw text")
            .expect("store");
        assert!(first.is_some());

        let again = db
            .store_parsed_invoice(7, 3, &parsed(), "raw text again")
            .expect("store");
        assert!(again.is_none(), "re-parse of same attachment is ignored");
    }

    #[test]
    fn test_amount_edit_sets_flag() {
        let db = test_db();
        let id = db
            .store_parsed_invoice(1, 1, &parsed(), "")
            .expect("store")
            .expect("row");

        assert!(db.update_invoice_amount(id, 999.0).expect("update"));
        let invoice = db.get_invoice(id).expect("fetch").expect("present");
        assert_eq!(invoice.amount, Some(999.0));
        assert!(invoice.amount_edited);
    }

    #[test]
    fn test_hidden_rows_excluded_from_listing() {
        let db = test_db();
        let id = db
            .store_parsed_invoice(1, 1, &parsed(), "")
            .expect("store")
            .expect("row");

        assert_eq!(db.list_invoices(false).expect("list").len(), 1);
        db.set_invoice_hidden(id, true).expect("hide");
        assert_eq!(db.list_invoices(false).expect("list").len(), 0);
        assert_eq!(db.list_invoices(true).expect("list").len(), 1);
    }

    #[test]
    fn test_tab_listing_matches_assignment_and_vendor() {
        let db = test_db();
        let assigned = db
            .store_parsed_invoice(1, 1, &parsed(), "")
            .expect("store")
            .expect("row");
        let mut other = parsed();
        other.vendor = Some("Beta Print".to_string());
        db.store_parsed_invoice(2, 1, &other, "").expect("store");

        db.assign_invoice_tab(assigned, Some("utilities"))
            .expect("assign");

        let tab = db.invoices_for_tab("utilities").expect("tab");
        assert_eq!(tab.len(), 1);
        assert_eq!(tab[0].invoice.id, assigned);

        // Unassigned row surfaces under a vendor-matching tab
        let beta = db.invoices_for_tab("beta").expect("tab");
        assert_eq!(beta.len(), 1);
        assert_eq!(beta[0].invoice.vendor.as_deref(), Some("Beta Print"));
    }

    #[test]
    fn test_email_orders_convert_ron_amounts() {
        let db = test_db();
        let email_id = db
            .insert_email(&NewEmail {
                message_id: Some("<o1@acme>".to_string()),
                from_address: Some("orders@acmelabels.ro".to_string()),
                date_received: Some("2025-06-01T10:00:00+00:00".to_string()),
                folder: "INBOX".to_string(),
                ..Default::default()
            })
            .expect("insert")
            .expect("row");

        let mut invoice = parsed();
        invoice.currency = Some("RON".to_string());
        invoice.amount = Some(497.0);
        db.store_parsed_invoice(1, email_id, &invoice, "")
            .expect("store");

        let orders = db.email_orders(20).expect("orders");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_number, "FCT-00042");
        let amount = orders[0].amount.expect("amount");
        assert!((amount - 100.0).abs() < 1e-9);
        assert_eq!(orders[0].date.as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn test_update_missing_invoice_reports_not_found() {
        let db = test_db();
        assert!(!db.update_invoice_amount(999, 1.0).expect("update"));
    }
}
