//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `folio_core` linkage.
//! - Optionally summarize an existing database: documents and version counts.
//! - Keep output deterministic for quick local sanity checks.

use folio_core::{
    open_db, DocumentListQuery, DocumentRepository, SqliteDocumentRepository,
    SqliteVersionRepository, VersionRepository,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("folio_core ping={}", folio_core::ping());
    println!("folio_core version={}", folio_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match summarize(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_summary module=cli status=error error={err}");
            eprintln!("folio_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let documents = SqliteDocumentRepository::try_new(&conn)?;
    let versions = SqliteVersionRepository::try_new(&conn)?;

    let items = documents.list_documents(&DocumentListQuery::default())?;
    println!("documents={}", items.len());
    for document in items {
        println!(
            "{} versions={} title={:?}",
            document.id,
            versions.count_versions(document.id)?,
            document.title
        );
    }
    Ok(())
}
