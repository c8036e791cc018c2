//! Contacts and organisations, derived from the mail corpus.
//!
//! Contacts are aggregated per sender address, with order references pulled
//! out of subjects and bodies by regex. Organisations group contacts by
//! domain, honoring the stored display-name, category, and address-assignment
//! overrides.

use std::collections::HashMap;
use std::sync::OnceLock;

use axum::extract::{Path, State};
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{ContactRow, OrganizationDetails, OrganizationFile};
use crate::server::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Clone, Serialize)]
pub struct OrderRef {
    pub number: String,
    pub subject: String,
    pub statuses: Vec<String>,
}

/// One sender aggregated across every email they appear in.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub email: String,
    pub name: String,
    pub company: String,
    pub email_count: i64,
    pub last_contact: Option<String>,
    pub orders: Vec<OrderRef>,
    pub statuses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Organisation {
    pub domain: String,
    pub name: String,
    pub category: String,
    pub contacts: Vec<Contact>,
    pub total_emails: i64,
    pub total_orders: i64,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
}

fn order_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)order\s*#?\s*(\d{4,})",
            r"(?i)order\s*number[:\s]*(\d{4,})",
            r"(?i)po[:\s#]*(\d{4,})",
            r"(?i)invoice[:\s#]*(\d{4,})",
            r"#(\d{5,})",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid order rule {p}: {e}")))
        .collect()
    })
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").unwrap_or_else(|e| panic!("invalid address rule: {e}"))
    })
}

const STATUS_KEYWORDS: &[(&str, &[&str])] = &[
    ("pending", &["pending", "waiting", "on hold", "processing"]),
    ("shipped", &["shipped", "dispatched", "sent", "delivered", "tracking"]),
    ("cancelled", &["cancelled", "canceled", "refund"]),
    ("problem", &["problem", "issue", "error", "failed", "delay", "urgent", "asap"]),
    ("confirmed", &["confirmed", "confirmation", "approved"]),
    ("payment", &["payment", "paid", "invoice"]),
];

/// Automated senders that never count as contacts.
const SYSTEM_SENDERS: &[&str] = &["mailer-daemon", "noreply", "no-reply", "accounts.google"];

/// Known sender domains and their business relationship. Checked before the
/// keyword scan; an explicit entity_categories row overrides both.
const DOMAIN_CATEGORIES: &[(&str, &str)] = &[
    ("delamode-group.com", "transport"),
    ("gavagroup.com", "transport"),
    ("dimensions-forwarding.com", "transport"),
    ("cargologistix-forwarding.ro", "transport"),
    ("mtrading.ro", "transport"),
    ("hartrodt.com", "transport"),
    ("klgeurope.com", "transport"),
    ("geis-group.de", "transport"),
    ("orbit-streem.com", "customers"),
    ("rohel.ro", "customers"),
    ("gyso.ch", "customers"),
    ("smarttax.ro", "taxation"),
    ("librabank.ro", "taxation"),
    ("customs.ro", "taxation"),
    ("jtape.com", "customers"),
    ("dtc-uk.com", "customers"),
    ("baxt-products.com", "customers"),
    ("bodyshopaustralia.com.au", "customers"),
    ("bellinisystems.it", "customers"),
    ("bolest.se", "customers"),
    ("amba.co.uk", "customers"),
    ("rotopak.gr", "suppliers"),
    ("centralpack.gr", "suppliers"),
    ("ntova.gr", "legal"),
    ("dfwprofessional.eu", "internal"),
];

/// Rotopak and Central Pack are the only real suppliers; most unknown
/// companies writing about orders are customers.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "transport",
        &[
            "shipping", "freight", "cargo", "transport", "delivery", "shipment", "logistics",
            "forwarding", "customs", "export", "import", "delamode", "gava", "dimensions",
            "cargologistix",
        ],
    ),
    ("taxation", &["tax", "vat", "payment", "accounting", "fiscal", "smarttax", "bank"]),
    ("legal", &["lawyer", "legal", "contract", "patent", "agreement", "law"]),
    ("suppliers", &["rotopak", "central pack", "centralpack"]),
    (
        "customers",
        &[
            "order", "purchase", "buy", "customer", "jtape", "dtc", "baxt", "bodyshop",
            "bellini", "bolest", "orbit", "streem", "gyso", "amba", "rohel",
        ],
    ),
];

const RELATIONSHIP_BUCKETS: &[&str] = &[
    "customers",
    "transport",
    "suppliers",
    "taxation",
    "legal",
    "internal",
    "other",
];

/// Category guess for a sender without an explicit override: known domains
/// first, then keyword matches against the lowercased text and the domain.
fn auto_category(domain: &str, text: &str) -> &'static str {
    for (known, category) in DOMAIN_CATEGORIES {
        if domain.contains(known) {
            return category;
        }
    }
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| text.contains(kw) || domain.contains(kw)) {
            return category;
        }
    }
    "other"
}

/// One category per sender domain: the stored override when present, otherwise
/// the auto classification of the domain's first email.
pub(crate) fn effective_categories(
    rows: &[ContactRow],
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for row in rows {
        let address = extract_address(&row.from_address);
        if SYSTEM_SENDERS.iter().any(|s| address.contains(s)) {
            continue;
        }
        let Some(domain) = domain_of(&address) else {
            continue;
        };
        if map.contains_key(domain) {
            continue;
        }
        let category = match overrides.get(domain) {
            Some(category) => category.clone(),
            None => {
                let text = format!(
                    "{} {}",
                    row.subject.as_deref().unwrap_or(""),
                    row.body_text.as_deref().unwrap_or("")
                )
                .to_lowercase();
                auto_category(domain, &text).to_string()
            }
        };
        map.insert(domain.to_string(), category);
    }
    map
}

/// Pull the bare address out of a `Name <addr>` header value.
fn extract_address(from: &str) -> String {
    if let (Some(start), Some(end)) = (from.find('<'), from.rfind('>')) {
        if start < end {
            return from[start + 1..end].trim().to_lowercase();
        }
    }
    match address_pattern().find(from) {
        Some(m) => m.as_str().to_lowercase(),
        None => from.trim().to_lowercase(),
    }
}

/// Display name from the header, falling back to the address local part.
fn extract_name(from: &str, address: &str) -> String {
    let prefix = from.split('<').next().unwrap_or("").trim().trim_matches('"');
    if !prefix.is_empty() && !prefix.contains('@') {
        return prefix.to_string();
    }
    address.split('@').next().unwrap_or(address).to_string()
}

fn domain_of(address: &str) -> Option<&str> {
    address.rsplit_once('@').map(|(_, domain)| domain)
}

/// Capitalized first label of the domain, used as a company guess.
fn company_from_domain(domain: &str) -> String {
    let label = domain.split('.').next().unwrap_or(domain);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn statuses_in(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (status, keywords) in STATUS_KEYWORDS {
        if keywords.iter().any(|kw| text.contains(kw)) {
            found.push((*status).to_string());
        }
    }
    found
}

/// Fold the mail corpus into one contact per sender address, newest first by
/// email volume.
pub(crate) fn aggregate_contacts(rows: &[ContactRow]) -> Vec<Contact> {
    let mut by_address: HashMap<String, Contact> = HashMap::new();

    for row in rows {
        let address = extract_address(&row.from_address);
        if SYSTEM_SENDERS.iter().any(|s| address.contains(s)) {
            continue;
        }

        let subject = row.subject.as_deref().unwrap_or("");
        let body = row.body_text.as_deref().unwrap_or("");
        let text = format!("{subject} {body}").to_lowercase();

        let contact = by_address.entry(address.clone()).or_insert_with(|| Contact {
            email: address.clone(),
            name: extract_name(&row.from_address, &address),
            company: domain_of(&address).map(company_from_domain).unwrap_or_default(),
            email_count: 0,
            last_contact: None,
            orders: Vec::new(),
            statuses: Vec::new(),
        });
        contact.email_count += 1;
        if row.date_received > contact.last_contact {
            contact.last_contact = row.date_received.clone();
        }

        for pattern in order_patterns() {
            for caps in pattern.captures_iter(&text) {
                let number = match caps.get(1) {
                    Some(m) => m.as_str().to_string(),
                    None => continue,
                };
                if contact.orders.iter().any(|o| o.number == number) {
                    continue;
                }
                let mut statuses = statuses_in(&text);
                if statuses.is_empty() {
                    statuses.push("unknown".to_string());
                }
                for status in &statuses {
                    if status != "unknown" && !contact.statuses.contains(status) {
                        contact.statuses.push(status.clone());
                    }
                }
                contact.orders.push(OrderRef {
                    number,
                    subject: subject.chars().take(100).collect(),
                    statuses,
                });
            }
        }
    }

    let mut contacts: Vec<Contact> = by_address.into_values().collect();
    contacts.sort_by(|a, b| b.email_count.cmp(&a.email_count));
    contacts
}

pub async fn list_contacts(State(state): State<SharedState>) -> ApiResult<Vec<Contact>> {
    let db = state.db.lock();
    let rows = db.contact_rows()?;
    Ok(Json(aggregate_contacts(&rows)))
}

/// One sender in the relationships view.
#[derive(Debug, Clone, Serialize)]
pub struct RelationshipContact {
    pub email: String,
    pub name: String,
    pub domain: String,
    pub email_count: i64,
    pub first_contact: Option<String>,
    pub last_contact: Option<String>,
}

/// Bucket every sender by business relationship. Every bucket is present in
/// the result, empty or not, sorted by email volume.
pub(crate) fn categorize_relationships(
    rows: &[ContactRow],
    overrides: &HashMap<String, String>,
) -> HashMap<String, Vec<RelationshipContact>> {
    let mut buckets: HashMap<String, HashMap<String, RelationshipContact>> = HashMap::new();
    for bucket in RELATIONSHIP_BUCKETS {
        buckets.insert((*bucket).to_string(), HashMap::new());
    }

    for row in rows {
        let address = extract_address(&row.from_address);
        if address.is_empty() || SYSTEM_SENDERS.iter().any(|s| address.contains(s)) {
            continue;
        }
        let domain = domain_of(&address).unwrap_or("").to_string();
        let text = format!(
            "{} {}",
            row.subject.as_deref().unwrap_or(""),
            row.body_text.as_deref().unwrap_or("")
        )
        .to_lowercase();

        let category = match overrides.get(&domain) {
            Some(category) => category.clone(),
            None => auto_category(&domain, &text).to_string(),
        };

        let entry = buckets
            .entry(category)
            .or_default()
            .entry(address.clone())
            .or_insert_with(|| RelationshipContact {
                email: address.clone(),
                name: extract_name(&row.from_address, &address),
                domain: domain.clone(),
                email_count: 0,
                first_contact: row.date_received.clone(),
                last_contact: row.date_received.clone(),
            });
        entry.email_count += 1;
        if row.date_received.is_some() {
            if entry.first_contact.is_none() || row.date_received < entry.first_contact {
                entry.first_contact = row.date_received.clone();
            }
            if row.date_received > entry.last_contact {
                entry.last_contact = row.date_received.clone();
            }
        }
    }

    buckets
        .into_iter()
        .map(|(category, contacts)| {
            let mut contacts: Vec<RelationshipContact> = contacts.into_values().collect();
            contacts.sort_by(|a, b| b.email_count.cmp(&a.email_count));
            (category, contacts)
        })
        .collect()
}

pub async fn relationships(
    State(state): State<SharedState>,
) -> ApiResult<HashMap<String, Vec<RelationshipContact>>> {
    let db = state.db.lock();
    let rows = db.contact_rows()?;
    let overrides = db.entity_categories()?;
    Ok(Json(categorize_relationships(&rows, &overrides)))
}

pub async fn list_organisations(State(state): State<SharedState>) -> ApiResult<Vec<Organisation>> {
    let db = state.db.lock();
    let rows = db.contact_rows()?;
    let categories = db.entity_categories()?;
    let names = db.organization_names()?;
    let assignments = db.email_assignments()?;
    let auto = effective_categories(&rows, &categories);

    let mut grouped: HashMap<String, Organisation> = HashMap::new();
    for contact in aggregate_contacts(&rows) {
        // An explicit assignment moves the contact to another organisation
        let domain = match assignments.get(&contact.email) {
            Some(assigned) => assigned.clone(),
            None => match domain_of(&contact.email) {
                Some(d) => d.to_string(),
                None => continue,
            },
        };

        let category = categories
            .get(&domain)
            .or_else(|| auto.get(&domain))
            .map(String::as_str)
            .unwrap_or("other");
        if category != "customers" {
            continue;
        }

        let org = grouped.entry(domain.clone()).or_insert_with(|| Organisation {
            name: names
                .get(&domain)
                .cloned()
                .unwrap_or_else(|| company_from_domain(&domain).to_uppercase()),
            domain,
            category: category.to_string(),
            contacts: Vec::new(),
            total_emails: 0,
            total_orders: 0,
            billing_address: None,
            shipping_address: None,
        });
        org.total_emails += contact.email_count;
        org.total_orders += contact.orders.len() as i64;
        org.contacts.push(contact);
    }

    let mut organisations: Vec<Organisation> = grouped.into_values().collect();
    for org in &mut organisations {
        let details = db.organization_details(&org.domain)?;
        org.billing_address = details.billing_address;
        org.shipping_address = details.shipping_address;
    }
    organisations.sort_by(|a, b| b.total_orders.cmp(&a.total_orders));
    Ok(Json(organisations))
}

pub async fn details(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
) -> ApiResult<OrganizationDetails> {
    let db = state.db.lock();
    Ok(Json(db.organization_details(&domain)?))
}

pub async fn delete_organisation(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    let removed = db.delete_organization(&domain)?;
    Ok(Json(json!({ "domain": domain, "removed": removed })))
}

#[derive(Debug, Deserialize)]
pub struct DetailsBody {
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
}

pub async fn save_details(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(body): Json<DetailsBody>,
) -> ApiResult<OrganizationDetails> {
    let db = state.db.lock();
    db.save_organization_details(
        &domain,
        body.billing_address.as_deref(),
        body.shipping_address.as_deref(),
    )?;
    Ok(Json(db.organization_details(&domain)?))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub display_name: String,
}

pub async fn rename(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(body): Json<RenameBody>,
) -> ApiResult<serde_json::Value> {
    if body.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("display_name must not be empty".to_string()));
    }
    let db = state.db.lock();
    db.set_organization_name(&domain, body.display_name.trim())?;
    Ok(Json(json!({ "domain": domain, "display_name": body.display_name.trim() })))
}

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub category: String,
}

pub async fn set_category(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(body): Json<CategoryBody>,
) -> ApiResult<serde_json::Value> {
    if body.category.trim().is_empty() {
        return Err(ApiError::BadRequest("category must not be empty".to_string()));
    }
    let db = state.db.lock();
    db.set_entity_category(&domain, body.category.trim())?;
    Ok(Json(json!({ "domain": domain, "category": body.category.trim() })))
}

#[derive(Debug, Deserialize)]
pub struct RelationshipBody {
    pub related_domain: Option<String>,
}

pub async fn set_relationship(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(body): Json<RelationshipBody>,
) -> ApiResult<serde_json::Value> {
    let related = body
        .related_domain
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let db = state.db.lock();
    db.set_organization_relationship(&domain, related)?;
    Ok(Json(json!({ "domain": domain, "related_domain": related })))
}

pub async fn list_files(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
) -> ApiResult<Vec<OrganizationFile>> {
    let db = state.db.lock();
    Ok(Json(db.organization_files(&domain)?))
}

#[derive(Debug, Deserialize)]
pub struct LinkFileBody {
    pub attachment_id: Option<i64>,
    pub filename: Option<String>,
    pub file_path: Option<String>,
    pub notes: Option<String>,
}

pub async fn link_file(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(body): Json<LinkFileBody>,
) -> ApiResult<serde_json::Value> {
    if body.attachment_id.is_none() && body.filename.is_none() {
        return Err(ApiError::BadRequest(
            "attachment_id or filename required".to_string(),
        ));
    }
    let db = state.db.lock();
    // Linking an archived attachment fills in its name and path
    let (filename, file_path) = match body.attachment_id {
        Some(attachment_id) => {
            let attachment = db.get_attachment(attachment_id)?.ok_or_else(|| {
                ApiError::NotFound(format!("attachment {attachment_id} not found"))
            })?;
            (attachment.filename, attachment.file_path)
        }
        None => (body.filename.clone(), body.file_path.clone()),
    };
    let id = db.link_organization_file(
        &domain,
        body.attachment_id,
        filename.as_deref(),
        file_path.as_deref(),
        body.notes.as_deref(),
    )?;
    Ok(Json(json!({ "id": id, "domain": domain })))
}

pub async fn delete_file(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let db = state.db.lock();
    if !db.delete_organization_file(id)? {
        return Err(ApiError::NotFound(format!("organization file {id} not found")));
    }
    Ok(Json(json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub email_address: String,
    pub organization_domain: String,
}

pub async fn assign_email(
    State(state): State<SharedState>,
    Json(body): Json<AssignBody>,
) -> ApiResult<serde_json::Value> {
    let address = body.email_address.trim().to_lowercase();
    let domain = body.organization_domain.trim().to_lowercase();
    if address.is_empty() || domain.is_empty() {
        return Err(ApiError::BadRequest(
            "email_address and organization_domain required".to_string(),
        ));
    }
    let db = state.db.lock();
    db.assign_email_to_organization(&address, &domain)?;
    Ok(Json(json!({ "email_address": address, "organization_domain": domain })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(from: &str, date: &str, subject: &str, body: &str) -> ContactRow {
        ContactRow {
            from_address: from.to_string(),
            date_received: Some(date.to_string()),
            subject: Some(subject.to_string()),
            body_text: Some(body.to_string()),
        }
    }

    #[test]
    fn test_contacts_aggregate_per_address() {
        let rows = vec![
            row(
                "Ana Pop <ana@acmelabels.ro>",
                "2025-06-01T10:00:00+00:00",
                "Order #12345 confirmed",
                "Your order is confirmed.",
            ),
            row(
                "ana@acmelabels.ro",
                "2025-06-03T10:00:00+00:00",
                "Re: Order #12345",
                "Shipped with tracking number.",
            ),
            row(
                "Dan <dan@beta.com>",
                "2025-06-02T10:00:00+00:00",
                "Hello",
                "No order here.",
            ),
        ];

        let contacts = aggregate_contacts(&rows);
        assert_eq!(contacts.len(), 2);

        let ana = &contacts[0];
        assert_eq!(ana.email, "ana@acmelabels.ro");
        assert_eq!(ana.name, "Ana Pop");
        assert_eq!(ana.company, "Acmelabels");
        assert_eq!(ana.email_count, 2);
        assert_eq!(ana.last_contact.as_deref(), Some("2025-06-03T10:00:00+00:00"));
        // Same order number across two emails counts once
        assert_eq!(ana.orders.len(), 1);
        assert_eq!(ana.orders[0].number, "12345");
        assert!(ana.statuses.contains(&"confirmed".to_string()));
    }

    #[test]
    fn test_system_senders_are_skipped() {
        let rows = vec![
            row("noreply@service.com", "2025-06-01", "Hi", ""),
            row("MAILER-DAEMON@mx.example", "2025-06-01", "Bounce", ""),
            row("real@person.com", "2025-06-01", "Hi", ""),
        ];
        let contacts = aggregate_contacts(&rows);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].email, "real@person.com");
    }

    #[test]
    fn test_order_statuses_default_to_unknown() {
        let rows = vec![row(
            "x@y.com",
            "2025-06-01",
            "PO: 55512",
            "Numbers only, nothing else.",
        )];
        let contacts = aggregate_contacts(&rows);
        assert_eq!(contacts[0].orders.len(), 1);
        assert_eq!(contacts[0].orders[0].statuses, vec!["unknown".to_string()]);
        assert!(contacts[0].statuses.is_empty());
    }

    #[test]
    fn test_auto_category_known_domains_and_keywords() {
        assert_eq!(auto_category("rotopak.gr", ""), "suppliers");
        assert_eq!(auto_category("mail.gyso.ch", ""), "customers");
        assert_eq!(auto_category("random.com", "your shipment left the freight terminal"), "transport");
        assert_eq!(auto_category("random.com", "purchase order attached"), "customers");
        assert_eq!(auto_category("random.com", "hello there"), "other");
    }

    #[test]
    fn test_effective_categories_override_beats_auto() {
        let rows = vec![
            row("ana@rotopak.gr", "2025-06-01", "Cardboard", "boxes"),
            row("dan@newshop.com", "2025-06-01", "Order 1234", "purchase order attached"),
        ];
        let mut overrides = HashMap::new();
        overrides.insert("rotopak.gr".to_string(), "customers".to_string());

        let map = effective_categories(&rows, &overrides);
        assert_eq!(map["rotopak.gr"], "customers", "stored category wins");
        assert_eq!(map["newshop.com"], "customers", "order keywords classify unknown domains");
    }

    #[test]
    fn test_relationships_bucket_senders() {
        let rows = vec![
            row(
                "Ana <ana@gyso.ch>",
                "2025-06-01T10:00:00+00:00",
                "Order update",
                "",
            ),
            row(
                "ana@gyso.ch",
                "2025-05-01T10:00:00+00:00",
                "First contact",
                "",
            ),
            row("tax@smarttax.ro", "2025-06-02", "VAT return", ""),
            row("noreply@service.com", "2025-06-02", "Automated", ""),
        ];
        let buckets = categorize_relationships(&rows, &HashMap::new());

        // Every fixed bucket is present even when empty
        for bucket in ["customers", "transport", "suppliers", "taxation", "legal", "internal", "other"] {
            assert!(buckets.contains_key(bucket), "missing bucket {bucket}");
        }

        let customers = &buckets["customers"];
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].email, "ana@gyso.ch");
        assert_eq!(customers[0].email_count, 2);
        assert_eq!(
            customers[0].first_contact.as_deref(),
            Some("2025-05-01T10:00:00+00:00")
        );
        assert_eq!(
            customers[0].last_contact.as_deref(),
            Some("2025-06-01T10:00:00+00:00")
        );

        assert_eq!(buckets["taxation"].len(), 1);
        assert!(buckets["other"].is_empty());
    }

    #[test]
    fn test_address_extraction_variants() {
        assert_eq!(extract_address("Ana <Ana@Acme.RO>"), "ana@acme.ro");
        assert_eq!(extract_address("plain bob@site.org here"), "bob@site.org");
        assert_eq!(extract_address("Unparseable Header"), "unparseable header");
    }
}
