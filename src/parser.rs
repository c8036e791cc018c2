//! Invoice field extraction from attachment text.
//!
//! Ordered regex rules, first match wins. No cross-field validation and no
//! confidence scoring: if neither an invoice number nor an amount is found,
//! the text is treated as unparsed and nothing is stored.

use std::sync::OnceLock;

use regex::Regex;

use crate::db::ParsedInvoice;

/// Stored raw text is capped at this many bytes.
pub const RAW_TEXT_LIMIT: usize = 5000;

struct InvoiceRules {
    number: Vec<Regex>,
    date: Vec<Regex>,
    /// (pattern, matched amount is in RON)
    amount: Vec<(Regex, bool)>,
    vendor: Vec<Regex>,
}

fn rules() -> &'static InvoiceRules {
    static RULES: OnceLock<InvoiceRules> = OnceLock::new();
    RULES.get_or_init(|| InvoiceRules {
        number: compile(&[
            r"(?i)(?:invoice|factura|inv)[\s#:№\.]*([A-Z]*[\d\-/]+)",
            r"(?i)(?:nr\.?|numar|number)[\s:]*([A-Z]*[\d\-/]+)",
            r"(?i)(?:document|doc)[\s#:]*([A-Z]*[\d\-/]+)",
        ]),
        date: compile(&[
            r"(?i)(?:date|data)[\s:]*(\d{1,2}[/\-\.]\d{1,2}[/\-\.]\d{2,4})",
            r"(\d{1,2}[/\-\.]\d{1,2}[/\-\.]\d{4})",
        ]),
        amount: vec![
            (
                compile_one(r"(?i)(?:total|amount|suma|valoare)[\s:]*(?:€|EUR|RON|USD|£)?\s*([\d,\.]+)"),
                false,
            ),
            (compile_one(r"(?i)(?:€|EUR)\s*([\d,\.]+)"), false),
            (compile_one(r"(?i)([\d,\.]+)\s*(?:€|EUR)"), false),
            (compile_one(r"(?i)(?:RON|Lei)\s*([\d,\.]+)"), true),
            (compile_one(r"(?i)([\d,\.]+)\s*(?:RON|Lei)"), true),
        ],
        vendor: compile(&[
            r"(?i)(?:from|de la|furnizor)[\s:]*([A-Za-z\s]+(?:SRL|SA|LLC|Ltd|GmbH)?)",
        ]),
    })
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile_one(p)).collect()
}

fn compile_one(pattern: &str) -> Regex {
    // Patterns are fixed at compile time; a bad one is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid invoice rule {pattern}: {e}"))
}

/// Parse invoice fields out of extracted text.
///
/// Returns `None` when the text yields neither an invoice number nor a
/// plausible amount.
pub fn parse_invoice_text(text: &str) -> Option<ParsedInvoice> {
    if text.trim().is_empty() {
        return None;
    }

    let rules = rules();

    let invoice_number = first_capture(&rules.number, text);
    let invoice_date = first_capture(&rules.date, text);

    let mut amount = None;
    let mut currency = "EUR".to_string();
    'amount: for (pattern, is_ron) in &rules.amount {
        for caps in pattern.captures_iter(text) {
            let raw = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let cleaned = raw.replace([',', ' '], "");
            if let Ok(value) = cleaned.parse::<f64>() {
                // Plausibility window weeds out page numbers and VAT rates
                if value > 10.0 && value < 10_000_000.0 {
                    amount = Some(value);
                    if *is_ron {
                        currency = "RON".to_string();
                    }
                    break 'amount;
                }
            }
        }
    }

    let vendor = first_capture(&rules.vendor, text).map(|v| {
        let trimmed = v.trim();
        trimmed.chars().take(100).collect::<String>()
    });

    if invoice_number.is_none() && amount.is_none() {
        return None;
    }

    Some(ParsedInvoice {
        invoice_number,
        invoice_date,
        amount,
        currency: Some(currency),
        vendor,
    })
}

/// Truncate raw text to the storage cap on a char boundary.
pub fn clip_raw_text(text: &str) -> &str {
    if text.len() <= RAW_TEXT_LIMIT {
        return text;
    }
    let mut end = RAW_TEXT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_romanian_invoice() {
        let text = "FACTURA Nr. FCT-2025/118\n\
                    Data: 12.06.2025\n\
                    Furnizor: Acme Labels SRL\n\
                    Total de plata: 4,820.50 RON";
        let parsed = parse_invoice_text(text).expect("should parse");
        assert_eq!(parsed.invoice_number.as_deref(), Some("FCT-2025/118"));
        assert_eq!(parsed.invoice_date.as_deref(), Some("12.06.2025"));
        assert_eq!(parsed.amount, Some(4820.50));
        assert_eq!(parsed.currency.as_deref(), Some("RON"));
        assert!(parsed.vendor.as_deref().unwrap_or("").contains("Acme Labels"));
    }

    #[test]
    fn test_ron_detection_from_currency_adjacent_amount() {
        let text = "Plata 250.00 Lei pentru factura 77";
        let parsed = parse_invoice_text(text).expect("should parse");
        assert_eq!(parsed.invoice_number.as_deref(), Some("77"));
        assert_eq!(parsed.currency.as_deref(), Some("RON"));
        assert_eq!(parsed.amount, Some(250.0));
    }

    #[test]
    fn test_euro_invoice() {
        let text = "Invoice #INV-0042\nDate: 01/06/2025\nAmount due: € 1,250.00\nFrom: Beta Print GmbH";
        let parsed = parse_invoice_text(text).expect("should parse");
        assert_eq!(parsed.invoice_number.as_deref(), Some("INV-0042"));
        assert_eq!(parsed.amount, Some(1250.0));
        assert_eq!(parsed.currency.as_deref(), Some("EUR"));
        assert!(parsed.vendor.as_deref().unwrap_or("").contains("Beta Print"));
    }

    #[test]
    fn test_implausible_amounts_skipped() {
        // 19 is a VAT rate here; 7 is below the window
        let text = "Invoice 55\nTVA: 7\nTotal: 5";
        let parsed = parse_invoice_text(text).expect("number alone is enough");
        assert_eq!(parsed.invoice_number.as_deref(), Some("55"));
        assert_eq!(parsed.amount, None);
    }

    #[test]
    fn test_unparsed_text_returns_none() {
        assert!(parse_invoice_text("").is_none());
        assert!(parse_invoice_text("Meeting notes from Tuesday, nothing billable.").is_none());
    }

    #[test]
    fn test_clip_raw_text_respects_char_boundaries() {
        let text = "ă".repeat(RAW_TEXT_LIMIT);
        let clipped = clip_raw_text(&text);
        assert!(clipped.len() <= RAW_TEXT_LIMIT);
        assert!(clipped.chars().all(|c| c == 'ă'));
    }
}
