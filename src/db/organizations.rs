use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};

use super::*;

impl ArchiveDb {
    // =========================================================================
    // Organization metadata (keyed by sender domain)
    // =========================================================================

    pub fn set_entity_category(&self, domain: &str, category: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO entity_categories (domain, category, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(domain) DO UPDATE SET
                    category = excluded.category,
                    updated_at = excluded.updated_at",
                params![domain, category, now_string()],
            )
            .map_err(|e| format!("Failed to set category for {domain}: {e}"))?;
        Ok(())
    }

    /// All domain → category assignments.
    pub fn entity_categories(&self) -> Result<HashMap<String, String>, String> {
        self.domain_value_map("entity_categories", "category")
    }

    pub fn set_organization_name(&self, domain: &str, display_name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO organization_names (domain, display_name, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(domain) DO UPDATE SET
                    display_name = excluded.display_name,
                    updated_at = excluded.updated_at",
                params![domain, display_name, now_string()],
            )
            .map_err(|e| format!("Failed to set name for {domain}: {e}"))?;
        Ok(())
    }

    /// All domain → display-name overrides.
    pub fn organization_names(&self) -> Result<HashMap<String, String>, String> {
        self.domain_value_map("organization_names", "display_name")
    }

    pub fn save_organization_details(
        &self,
        domain: &str,
        billing_address: Option<&str>,
        shipping_address: Option<&str>,
    ) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO organization_details (domain, billing_address, shipping_address, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(domain) DO UPDATE SET
                    billing_address = excluded.billing_address,
                    shipping_address = excluded.shipping_address,
                    updated_at = excluded.updated_at",
                params![domain, billing_address, shipping_address, now_string()],
            )
            .map_err(|e| format!("Failed to save details for {domain}: {e}"))?;
        Ok(())
    }

    /// Assembled view of everything stored about one domain.
    pub fn organization_details(&self, domain: &str) -> Result<OrganizationDetails, String> {
        let display_name: Option<String> = self
            .conn
            .query_row(
                "SELECT display_name FROM organization_names WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to read name for {domain}: {e}"))?;

        let category: Option<String> = self
            .conn
            .query_row(
                "SELECT category FROM entity_categories WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to read category for {domain}: {e}"))?;

        let addresses: Option<(Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT billing_address, shipping_address FROM organization_details WHERE domain = ?1",
                params![domain],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| format!("Failed to read details for {domain}: {e}"))?;

        let related_domain: Option<String> = self
            .conn
            .query_row(
                "SELECT related_domain FROM organization_relationships WHERE domain = ?1",
                params![domain],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| format!("Failed to read relationship for {domain}: {e}"))?
            .flatten();

        let (billing_address, shipping_address) = addresses.unwrap_or((None, None));

        Ok(OrganizationDetails {
            domain: domain.to_string(),
            display_name,
            category,
            billing_address,
            shipping_address,
            related_domain,
        })
    }

    pub fn assign_email_to_organization(
        &self,
        email_address: &str,
        organization_domain: &str,
    ) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO email_organization_assignments (email_address, organization_domain, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(email_address) DO UPDATE SET
                    organization_domain = excluded.organization_domain,
                    updated_at = excluded.updated_at",
                params![email_address, organization_domain, now_string()],
            )
            .map_err(|e| format!("Failed to assign {email_address}: {e}"))?;
        Ok(())
    }

    /// All address → organization-domain assignments.
    pub fn email_assignments(&self) -> Result<HashMap<String, String>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT email_address, organization_domain FROM email_organization_assignments",
            )
            .map_err(|e| format!("Failed to prepare assignments query: {e}"))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| format!("Failed to query assignments: {e}"))?;

        let mut map = HashMap::new();
        for row in rows {
            let (address, domain): (String, String) =
                row.map_err(|e| format!("Failed to read assignment row: {e}"))?;
            map.insert(address, domain);
        }
        Ok(map)
    }

    pub fn set_organization_relationship(
        &self,
        domain: &str,
        related_domain: Option<&str>,
    ) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT INTO organization_relationships (domain, related_domain, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(domain) DO UPDATE SET
                    related_domain = excluded.related_domain,
                    updated_at = excluded.updated_at",
                params![domain, related_domain, now_string()],
            )
            .map_err(|e| format!("Failed to set relationship for {domain}: {e}"))?;
        Ok(())
    }

    // =========================================================================
    // Organization files
    // =========================================================================

    pub fn link_organization_file(
        &self,
        domain: &str,
        attachment_id: Option<i64>,
        filename: Option<&str>,
        file_path: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64, String> {
        self.conn
            .execute(
                "INSERT INTO organization_files (domain, attachment_id, filename, file_path, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![domain, attachment_id, filename, file_path, notes],
            )
            .map_err(|e| format!("Failed to link file for {domain}: {e}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn organization_files(&self, domain: &str) -> Result<Vec<OrganizationFile>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, domain, attachment_id, filename, file_path, notes, created_at
                 FROM organization_files WHERE domain = ?1 ORDER BY id DESC",
            )
            .map_err(|e| format!("Failed to prepare organization files query: {e}"))?;

        let rows = stmt
            .query_map(params![domain], |row| {
                Ok(OrganizationFile {
                    id: row.get(0)?,
                    domain: row.get(1)?,
                    attachment_id: row.get(2)?,
                    filename: row.get(3)?,
                    file_path: row.get(4)?,
                    notes: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(|e| format!("Failed to query organization files: {e}"))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| format!("Failed to read file row: {e}"))?);
        }
        Ok(results)
    }

    pub fn delete_organization_file(&self, id: i64) -> Result<bool, String> {
        let changed = self
            .conn
            .execute("DELETE FROM organization_files WHERE id = ?1", params![id])
            .map_err(|e| format!("Failed to delete organization file {id}: {e}"))?;
        Ok(changed > 0)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove every piece of metadata stored for a domain, in one transaction.
    /// Archived mail and attachments are never touched by this operation.
    /// Returns the total number of rows removed.
    pub fn delete_organization(&self, domain: &str) -> Result<usize, String> {
        self.with_transaction(|tx| {
            let mut removed = 0usize;
            for sql in [
                "DELETE FROM entity_categories WHERE domain = ?1",
                "DELETE FROM organization_names WHERE domain = ?1",
                "DELETE FROM organization_details WHERE domain = ?1",
                "DELETE FROM organization_relationships WHERE domain = ?1 OR related_domain = ?1",
                "DELETE FROM email_organization_assignments WHERE organization_domain = ?1",
                "DELETE FROM organization_files WHERE domain = ?1",
            ] {
                removed += tx
                    .conn
                    .execute(sql, params![domain])
                    .map_err(|e| format!("Failed to delete organization {domain}: {e}"))?;
            }
            Ok(removed)
        })
    }

    fn domain_value_map(&self, table: &str, column: &str) -> Result<HashMap<String, String>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT domain, {column} FROM {table}"))
            .map_err(|e| format!("Failed to prepare {table} query: {e}"))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| format!("Failed to query {table}: {e}"))?;

        let mut map = HashMap::new();
        for row in rows {
            let (domain, value): (String, String) =
                row.map_err(|e| format!("Failed to read {table} row: {e}"))?;
            map.insert(domain, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;

    #[test]
    fn test_details_assemble_across_tables() {
        let db = test_db();
        db.set_organization_name("acmelabels.ro", "Acme Labels")
            .expect("name");
        db.set_entity_category("acmelabels.ro", "customer")
            .expect("category");
        db.save_organization_details("acmelabels.ro", Some("Str. Fabricii 1"), None)
            .expect("details");
        db.set_organization_relationship("acmelabels.ro", Some("acme-group.com"))
            .expect("relationship");

        let details = db.organization_details("acmelabels.ro").expect("details");
        assert_eq!(details.display_name.as_deref(), Some("Acme Labels"));
        assert_eq!(details.category.as_deref(), Some("customer"));
        assert_eq!(details.billing_address.as_deref(), Some("Str. Fabricii 1"));
        assert_eq!(details.related_domain.as_deref(), Some("acme-group.com"));
    }

    #[test]
    fn test_delete_organization_cascades_metadata_only() {
        let db = test_db();
        db.set_organization_name("acmelabels.ro", "Acme Labels")
            .expect("name");
        db.set_entity_category("acmelabels.ro", "customer")
            .expect("category");
        db.assign_email_to_organization("ana@acmelabels.ro", "acmelabels.ro")
            .expect("assign");
        db.link_organization_file("acmelabels.ro", None, Some("contract.pdf"), None, None)
            .expect("file");

        // An archived email from the same domain must survive deletion
        db.conn_ref()
            .execute(
                "INSERT INTO emails (message_id, from_address) VALUES ('<m@a>', 'ana@acmelabels.ro')",
                [],
            )
            .expect("seed email");

        let removed = db.delete_organization("acmelabels.ro").expect("delete");
        assert_eq!(removed, 4);

        assert!(db.entity_categories().expect("cats").is_empty());
        assert!(db.organization_names().expect("names").is_empty());
        assert!(db.email_assignments().expect("assignments").is_empty());
        assert!(db.organization_files("acmelabels.ro").expect("files").is_empty());

        let emails: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM emails", [], |row| row.get(0))
            .expect("count");
        assert_eq!(emails, 1, "mail corpus is never cascaded");
    }

    #[test]
    fn test_assignment_upsert_replaces_domain() {
        let db = test_db();
        db.assign_email_to_organization("ana@acmelabels.ro", "old.com")
            .expect("assign");
        db.assign_email_to_organization("ana@acmelabels.ro", "acmelabels.ro")
            .expect("reassign");

        let map = db.email_assignments().expect("map");
        assert_eq!(map.len(), 1);
        assert_eq!(map["ana@acmelabels.ro"], "acmelabels.ro");
    }
}
