//! Database audit runs driven by an in-memory procedure catalog

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use mssql_temp_table_finder::{
    audit_catalog, ProcedureCatalog, ProcedureName, TempTableFinderError,
};

use crate::common::names;

enum Definition {
    Text(&'static str),
    /// Server returned NULL (encrypted procedure or no VIEW DEFINITION)
    Missing,
    /// Query failed mid-run
    Unreadable,
}

struct InMemoryCatalog {
    database: String,
    procedures: Vec<(ProcedureName, Definition)>,
    listing_fails: bool,
}

impl InMemoryCatalog {
    fn new(procedures: Vec<(&str, Definition)>) -> Self {
        Self {
            database: "Sales".to_string(),
            procedures: procedures
                .into_iter()
                .map(|(name, definition)| {
                    let name = ProcedureName {
                        schema: "dbo".to_string(),
                        name: name.to_string(),
                    };
                    (name, definition)
                })
                .collect(),
            listing_fails: false,
        }
    }
}

fn protocol_error(message: &'static str) -> tiberius::error::Error {
    tiberius::error::Error::Protocol(message.into())
}

#[async_trait]
impl ProcedureCatalog for InMemoryCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn procedure_names(&mut self) -> Result<Vec<ProcedureName>, TempTableFinderError> {
        if self.listing_fails {
            return Err(TempTableFinderError::ProcedureListError {
                database: self.database.clone(),
                source: protocol_error("connection reset"),
            });
        }
        Ok(self.procedures.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn procedure_definition(
        &mut self,
        procedure: &ProcedureName,
    ) -> Result<Option<String>, TempTableFinderError> {
        let definition = self
            .procedures
            .iter()
            .find(|(name, _)| name == procedure)
            .map(|(_, definition)| definition);

        match definition {
            Some(Definition::Text(sql)) => Ok(Some(sql.to_string())),
            Some(Definition::Missing) | None => Ok(None),
            Some(Definition::Unreadable) => Err(TempTableFinderError::ProcedureFetchError {
                procedure: procedure.to_string(),
                source: protocol_error("connection reset"),
            }),
        }
    }
}

#[tokio::test]
async fn test_empty_database_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut catalog = InMemoryCatalog::new(vec![]);

    let err = audit_catalog(&mut catalog, dir.path().join("audit.xlsx"), None)
        .await
        .expect_err("an empty procedure list should abort the run");

    assert!(
        matches!(
            err.downcast_ref::<TempTableFinderError>(),
            Some(TempTableFinderError::NoProceduresFound { database }) if database == "Sales"
        ),
        "Expected NoProceduresFound, got {:?}",
        err
    );
    assert!(!dir.path().join("audit.xlsx").exists());
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut catalog = InMemoryCatalog::new(vec![("usp_Clean", Definition::Text("SELECT 1"))]);
    catalog.listing_fails = true;

    let err = audit_catalog(&mut catalog, dir.path().join("audit.xlsx"), None)
        .await
        .expect_err("a listing failure should abort the run");

    assert!(matches!(
        err.downcast_ref::<TempTableFinderError>(),
        Some(TempTableFinderError::ProcedureListError { .. })
    ));
}

#[tokio::test]
async fn test_unfetchable_procedures_are_skipped_and_the_rest_scanned() {
    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("audit.xlsx");
    let mut catalog = InMemoryCatalog::new(vec![
        ("usp_Broken", Definition::Text("SELECT 'open")),
        (
            "usp_Clean",
            Definition::Text("CREATE TABLE #A (OrderId INT)\nDROP TABLE #A"),
        ),
        ("usp_Encrypted", Definition::Missing),
        (
            "usp_Leaky",
            Definition::Text("CREATE TABLE #Kept (OrderId INT)\nCREATE TABLE #Gone (OrderId INT)\nDROP TABLE #Gone"),
        ),
        ("usp_Unreadable", Definition::Unreadable),
    ]);

    let summary = audit_catalog(&mut catalog, output_path.clone(), Some(2))
        .await
        .expect("fetch failures should not abort the run");
    let outcome = &summary.outcome;

    assert_eq!(outcome.scanned, 2);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].procedure, "dbo.usp_Leaky");
    assert_eq!(outcome.findings[0].orphaned, names(&["#Kept"]));

    // Fetch-time skips come before scan-time skips
    let skipped: Vec<&str> = outcome.skipped.iter().map(|s| s.procedure.as_str()).collect();
    assert_eq!(
        skipped,
        vec!["dbo.usp_Encrypted", "dbo.usp_Unreadable", "dbo.usp_Broken"]
    );
    assert_eq!(outcome.skipped[0].reason, "empty definition");
    assert!(outcome.skipped[1].reason.contains("dbo.usp_Unreadable"));

    assert!(output_path.exists());
    assert!(summary.report_path.is_some());
}
