//! Archiver CLI: download a mailbox, list archived mail, view one email.

use clap::{Parser, Subcommand};

use opsdesk::config::Config;
use opsdesk::db::ArchiveDb;
use opsdesk::{archiver, parser as invoice_parser};

#[derive(Parser)]
#[command(name = "archiver", about = "Download and browse the local email archive")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download emails from the configured IMAP account
    Download {
        /// Account to log in as; overrides IMAP_EMAIL
        #[arg(long, env = "IMAP_EMAIL")]
        email: Option<String>,
        /// IMAP server hostname; overrides IMAP_SERVER
        #[arg(long)]
        server: Option<String>,
        /// Mailbox folder to download from
        #[arg(long, default_value = "INBOX")]
        folder: String,
        /// Maximum number of messages to fetch
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// List archived emails, newest first
    List {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Print one archived email in full
    View { email_id: i64 },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    let db = match ArchiveDb::open(&config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open archive: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Download {
            email,
            server,
            folder,
            limit,
        } => {
            if email.is_some() {
                config.imap_email = email;
            }
            if let Some(server) = server {
                config.imap_server = server;
            }
            download(&db, &config, &folder, limit)
        }
        Command::List { limit } => list(&db, limit),
        Command::View { email_id } => view(&db, email_id),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn download(db: &ArchiveDb, config: &Config, folder: &str, limit: usize) -> Result<(), String> {
    let report =
        archiver::download_mailbox(db, config, folder, limit).map_err(|e| e.to_string())?;
    println!(
        "Fetched {} messages: {} archived, {} already present, {} attachments, {} invoices parsed",
        report.fetched, report.archived, report.skipped, report.attachments, report.invoices
    );
    Ok(())
}

fn list(db: &ArchiveDb, limit: i64) -> Result<(), String> {
    let emails = db.list_emails(limit, 0, None)?;
    if emails.is_empty() {
        println!("No emails archived yet.");
        return Ok(());
    }
    for email in emails {
        println!(
            "[{}] {}  {}  ({} attachment{})",
            email.id,
            email.date_received.as_deref().unwrap_or("-"),
            email.subject.as_deref().unwrap_or("(no subject)"),
            email.attachment_count,
            if email.attachment_count == 1 { "" } else { "s" }
        );
        println!("      from: {}", email.from_address.as_deref().unwrap_or("-"));
    }
    Ok(())
}

fn view(db: &ArchiveDb, email_id: i64) -> Result<(), String> {
    let email = db
        .get_email(email_id)?
        .ok_or_else(|| format!("No email with id {email_id}"))?;

    println!("Subject: {}", email.subject.as_deref().unwrap_or("(no subject)"));
    println!("From:    {}", email.from_address.as_deref().unwrap_or("-"));
    println!("To:      {}", email.to_address.as_deref().unwrap_or("-"));
    println!("Date:    {}", email.date_received.as_deref().unwrap_or("-"));
    println!("Folder:  {}", email.folder.as_deref().unwrap_or("-"));

    let attachments = db.attachments_for_email(email_id)?;
    if !attachments.is_empty() {
        println!("Attachments:");
        for a in &attachments {
            println!(
                "  [{}] {} ({} bytes)",
                a.id,
                a.filename.as_deref().unwrap_or("-"),
                a.size.unwrap_or(0)
            );
        }
    }

    if let Some(body) = &email.body_text {
        println!("\n{}", invoice_parser::clip_raw_text(body));
    }
    Ok(())
}
