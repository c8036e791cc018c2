use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // Production runs
    // =========================================================================

    pub fn create_production_run(&self, input: &ProductionRunInput) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO production_runs (
                    client, order_ref, product, quantity, status, notes,
                    scheduled_month, eta_month, date_ordered, downpayment_paid,
                    date_prod_start, date_prod_end, date_warehouse, paid_off,
                    date_delivered, price_per_roll, cost_per_roll
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    input.client,
                    input.order_ref,
                    input.product,
                    input.quantity,
                    input.status.as_deref().unwrap_or("pending"),
                    input.notes,
                    input.scheduled_month,
                    input.eta_month,
                    input.date_ordered,
                    input.downpayment_paid as i32,
                    input.date_prod_start,
                    input.date_prod_end,
                    input.date_warehouse,
                    input.paid_off as i32,
                    input.date_delivered,
                    input.price_per_roll,
                    input.cost_per_roll,
                ],
            )
            .map_err(|e| format!("Failed to create production run: {e}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_production_run(&self, id: i64, input: &ProductionRunInput) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE production_runs SET
                    client = ?1, order_ref = ?2, product = ?3, quantity = ?4,
                    status = ?5, notes = ?6, scheduled_month = ?7, eta_month = ?8,
                    date_ordered = ?9, downpayment_paid = ?10, date_prod_start = ?11,
                    date_prod_end = ?12, date_warehouse = ?13, paid_off = ?14,
                    date_delivered = ?15, price_per_roll = ?16, cost_per_roll = ?17,
                    updated_at = ?18
                 WHERE id = ?19",
                params![
                    input.client,
                    input.order_ref,
                    input.product,
                    input.quantity,
                    input.status.as_deref().unwrap_or("pending"),
                    input.notes,
                    input.scheduled_month,
                    input.eta_month,
                    input.date_ordered,
                    input.downpayment_paid as i32,
                    input.date_prod_start,
                    input.date_prod_end,
                    input.date_warehouse,
                    input.paid_off as i32,
                    input.date_delivered,
                    input.price_per_roll,
                    input.cost_per_roll,
                    now_string(),
                    id,
                ],
            )
            .map_err(|e| format!("Failed to update production run {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn delete_production_run(&self, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute("DELETE FROM production_runs WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete production run {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn list_production_runs(&self) -> Result<Vec<ProductionRun>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM production_runs ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|e| format!("Failed to prepare production runs query: {e}"))?;

        let rows = stmt
            .query_map([], map_run_row)
            .map_err(|e| format!("Failed to query production runs: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read production run: {e}"))?);
        }
        Ok(results)
    }

    pub fn get_production_run(&self, id: i64) -> Result<Option<ProductionRun>, String> {
        self.conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM production_runs WHERE id = ?1"),
                params![id],
                map_run_row,
            )
            .optional()
            .map_err(|e| format!("Failed to fetch production run {id}: {e}"))
    }

    // =========================================================================
    // Production feedback
    // =========================================================================

    pub fn create_feedback(&self, input: &FeedbackInput) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO production_feedback (title, description, status, files, feedback_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    input.title,
                    input.description,
                    input.status.as_deref().unwrap_or("pending"),
                    input.files,
                    input.feedback_date,
                ],
            )
            .map_err(|e| format!("Failed to create feedback: {e}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_feedback(&self, id: i64, input: &FeedbackInput) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE production_feedback SET
                    title = ?1, description = ?2, status = ?3, files = ?4,
                    feedback_date = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    input.title,
                    input.description,
                    input.status.as_deref().unwrap_or("pending"),
                    input.files,
                    input.feedback_date,
                    now_string(),
                    id,
                ],
            )
            .map_err(|e| format!("Failed to update feedback {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn delete_feedback(&self, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute("DELETE FROM production_feedback WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete feedback {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn list_feedback(&self) -> Result<Vec<FeedbackItem>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, description, status, files, feedback_date, created_at, updated_at
                 FROM production_feedback ORDER BY feedback_date DESC, id DESC",
            )
            .map_err(|e| format!("Failed to prepare feedback query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FeedbackItem {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    status: row.get(3)?,
                    files: row.get(4)?,
                    feedback_date: row.get(5)?,
                    created_at: row.get(6)?,
                    updated_at: row.get(7)?,
                })
            })
            .map_err(|e| format!("Failed to query feedback: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read feedback row: {e}"))?);
        }
        Ok(results)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub fn create_product(&self, input: &ProductInput) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO products (name, description, price, notes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![input.name, input.description, input.price, input.notes],
            )
            .map_err(|e| format!("Failed to create product {}: {e}", input.name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_product(&self, id: i64, input: &ProductInput) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE products SET name = ?1, description = ?2, price = ?3, notes = ?4
                 WHERE id = ?5",
                params![input.name, input.description, input.price, input.notes, id],
            )
            .map_err(|e| format!("Failed to update product {id}: {e}"))?;
        Ok(changed > 0)
    }

    pub fn delete_product(&self, id: i64) -> Result<bool, String> {
        self.with_transaction(|tx| {
            tx.conn
                .execute(
                    "DELETE FROM client_product_prices WHERE product_id = ?1",
                    params![id],
                )
                .map_err(|e| format!("Failed to delete prices for product {id}: {e}"))?;
            let changed = tx
                .conn
                .execute("DELETE FROM products WHERE id = ?1", params![id])
                .map_err(|e| format!("Failed to delete product {id}: {e}"))?;
            Ok(changed > 0)
        })
    }

    pub fn list_products(&self) -> Result<Vec<Product>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, description, price, notes, created_at
                 FROM products ORDER BY name",
            )
            .map_err(|e| format!("Failed to prepare products query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    price: row.get(3)?,
                    notes: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| format!("Failed to query products: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read product row: {e}"))?);
        }
        Ok(results)
    }

    // =========================================================================
    // Clients
    // =========================================================================

    pub fn create_client(&self, input: &ClientInput) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO clients (name, contact_info, billing_address, shipping_address, country)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    input.name,
                    input.contact_info,
                    input.billing_address,
                    input.shipping_address,
                    input.country,
                ],
            )
            .map_err(|e| format!("Failed to create client {}: {e}", input.name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_client(&self, id: i64, input: &ClientInput) -> Result<bool, String> {
        let changed = self
            .conn
            .execute(
                "UPDATE clients SET name = ?1, contact_info = ?2, billing_address = ?3,
                        shipping_address = ?4, country = ?5
                 WHERE id = ?6",
                params![
                    input.name,
                    input.contact_info,
                    input.billing_address,
                    input.shipping_address,
                    input.country,
                    id,
                ],
            )
            .map_err(|e| format!("Failed to update client {id}: {e}"))?;
        Ok(changed > 0)
    }

    /// Delete a client. Refused while price agreements still reference it so
    /// business documents never dangle.
    pub fn delete_client(&self, id: i64) -> Result<ClientDeleteOutcome, String> {
        let price_rows: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM client_product_prices WHERE client_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| format!("Failed to check prices for client {id}: {e}"))?;

        if price_rows > 0 {
            return Ok(ClientDeleteOutcome::Blocked { price_rows });
        }

        let changed = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete client {id}: {e}"))?;
        if changed > 0 {
            Ok(ClientDeleteOutcome::Deleted)
        } else {
            Ok(ClientDeleteOutcome::NotFound)
        }
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, contact_info, billing_address, shipping_address, country, created_at
                 FROM clients ORDER BY name",
            )
            .map_err(|e| format!("Failed to prepare clients query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    contact_info: row.get(2)?,
                    billing_address: row.get(3)?,
                    shipping_address: row.get(4)?,
                    country: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(|e| format!("Failed to query clients: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read client row: {e}"))?);
        }
        Ok(results)
    }

    // =========================================================================
    // Client product prices
    // =========================================================================

    pub fn set_client_product_price(
        &self,
        client_id: i64,
        product_id: i64,
        price: f64,
    ) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO client_product_prices (client_id, product_id, price, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(client_id, product_id) DO UPDATE SET
                    price = excluded.price,
                    updated_at = excluded.updated_at",
                params![client_id, product_id, price, now_string()],
            )
            .map_err(|e| format!("Failed to set price for client {client_id}: {e}"))?;
        Ok(())
    }

    pub fn client_product_price(
        &self,
        client_id: i64,
        product_id: i64,
    ) -> Result<Option<f64>, String> {
        self.conn
            .query_row(
                "SELECT price FROM client_product_prices WHERE client_id = ?1 AND product_id = ?2",
                params![client_id, product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to look up price: {e}"))
    }

    pub fn list_client_product_prices(&self) -> Result<Vec<ClientProductPrice>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.id, p.client_id, p.product_id, p.price, c.name, pr.name, p.updated_at
                 FROM client_product_prices p
                 LEFT JOIN clients c ON c.id = p.client_id
                 LEFT JOIN products pr ON pr.id = p.product_id
                 ORDER BY c.name, pr.name",
            )
            .map_err(|e| format!("Failed to prepare prices query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ClientProductPrice {
                    id: row.get(0)?,
                    client_id: row.get(1)?,
                    product_id: row.get(2)?,
                    price: row.get(3)?,
                    client_name: row.get(4)?,
                    product_name: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })
            .map_err(|e| format!("Failed to query prices: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read price row: {e}"))?);
        }
        Ok(results)
    }

    pub fn delete_client_product_price(&self, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute("DELETE FROM client_product_prices WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete price {id}: {e}"))?;
        Ok(changed > 0)
    }

    // =========================================================================
    // Production files
    // =========================================================================

    pub fn add_production_file(
        &self,
        client: Option<&str>,
        filename: &str,
        filepath: &str,
        description: Option<&str>,
    ) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO production_files (client, filename, filepath, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![client, filename, filepath, description],
            )
            .map_err(|e| format!("Failed to add production file {filename}: {e}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_production_files(&self) -> Result<Vec<ProductionFile>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, client, filename, filepath, description, created_at
                 FROM production_files ORDER BY id DESC",
            )
            .map_err(|e| format!("Failed to prepare production files query: {e}"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ProductionFile {
                    id: row.get(0)?,
                    client: row.get(1)?,
                    filename: row.get(2)?,
                    filepath: row.get(3)?,
                    description: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| format!("Failed to query production files: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read file row: {e}"))?);
        }
        Ok(results)
    }

    pub fn delete_production_file(&self, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute("DELETE FROM production_files WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete production file {id}: {e}"))?;
        Ok(changed > 0)
    }
}

/// Result of a client delete attempt.
#[derive(Debug, PartialEq)]
pub enum ClientDeleteOutcome {
    Deleted,
    NotFound,
    Blocked { price_rows: i64 },
}

const RUN_COLUMNS: &str = "id, client, order_ref, product, quantity, status, notes, \
     scheduled_month, eta_month, date_ordered, downpayment_paid, date_prod_start, \
     date_prod_end, date_warehouse, paid_off, date_delivered, price_per_roll, \
     cost_per_roll, created_at, updated_at";

fn map_run_row(row: &rusqlite::Row) -> rusqlite::Result<ProductionRun> {
    Ok(ProductionRun {
        id: row.get(0)?,
        client: row.get(1)?,
        order_ref: row.get(2)?,
        product: row.get(3)?,
        quantity: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        scheduled_month: row.get(7)?,
        eta_month: row.get(8)?,
        date_ordered: row.get(9)?,
        downpayment_paid: row.get::<_, i32>(10)? != 0,
        date_prod_start: row.get(11)?,
        date_prod_end: row.get(12)?,
        date_warehouse: row.get(13)?,
        paid_off: row.get::<_, i32>(14)? != 0,
        date_delivered: row.get(15)?,
        price_per_roll: row.get(16)?,
        cost_per_roll: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}
