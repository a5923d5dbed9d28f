//! End-to-end tests against a live SQL Server
//!
//! Environment variables (with defaults):
//! - SQL_SERVER_HOST (default: localhost)
//! - SQL_SERVER_PORT (default: 1433)
//! - SQL_SERVER_USER (default: sa)
//! - SQL_SERVER_PASSWORD (default: Password1)

use std::sync::LazyLock;

use tempfile::TempDir;

use mssql_temp_table_finder::{
    run_audit, AuditOptions, ConnectionSettings, ProcedureCatalog, ProcedureName, SqlServerCatalog,
};

use crate::common::names;

/// Load environment variables from .env file (if present)
fn load_env() {
    let _ = dotenvy::dotenv();
}

/// SQL Server connection configuration loaded from environment
static SQL_CONFIG: LazyLock<ConnectionSettings> = LazyLock::new(|| {
    load_env();
    ConnectionSettings {
        host: std::env::var("SQL_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("SQL_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1433),
        database: "master".to_string(),
        user: std::env::var("SQL_SERVER_USER").unwrap_or_else(|_| "sa".to_string()),
        password: std::env::var("SQL_SERVER_PASSWORD").unwrap_or_else(|_| "Password1".to_string()),
        trust_cert: true,
    }
});

const TEST_DATABASE: &str = "TempTableFinder_Test";

fn settings(database: &str) -> ConnectionSettings {
    ConnectionSettings {
        database: database.to_string(),
        ..SQL_CONFIG.clone()
    }
}

const LEAKY_PROCEDURE: &str = "CREATE PROCEDURE dbo.usp_Leaky AS
BEGIN
    CREATE TABLE #Kept (Id INT);
    CREATE TABLE #Dropped (Id INT);
    DROP TABLE #Dropped;
END";

const CLEAN_PROCEDURE: &str = "CREATE PROCEDURE dbo.usp_Clean AS
BEGIN
    CREATE TABLE #A (Id INT);
    CREATE TABLE #B (Id INT);
    DROP TABLE #A, #B;
END";

/// Recreate the test database and its procedures. Tiberius runs one batch per
/// call, so every CREATE PROCEDURE is sent on its own.
async fn prepare_database() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = connect_raw("master").await?;
    let recreate = format!(
        "IF EXISTS (SELECT 1 FROM sys.databases WHERE name = '{db}') \
         BEGIN \
             ALTER DATABASE [{db}] SET SINGLE_USER WITH ROLLBACK IMMEDIATE; \
             DROP DATABASE [{db}]; \
         END; \
         CREATE DATABASE [{db}];",
        db = TEST_DATABASE
    );
    client.execute(recreate.as_str(), &[]).await?;

    let mut client = connect_raw(TEST_DATABASE).await?;
    client.execute(LEAKY_PROCEDURE, &[]).await?;
    client.execute(CLEAN_PROCEDURE, &[]).await?;
    Ok(())
}

type SqlClient = tiberius::Client<tokio_util::compat::Compat<tokio::net::TcpStream>>;

async fn connect_raw(database: &str) -> Result<SqlClient, Box<dyn std::error::Error>> {
    use tokio_util::compat::TokioAsyncWriteCompatExt;

    let settings = settings(database);
    let mut config = tiberius::Config::new();
    config.host(&settings.host);
    config.port(settings.port);
    config.database(&settings.database);
    config.authentication(tiberius::AuthMethod::sql_server(&settings.user, &settings.password));
    config.trust_cert();

    let tcp = tokio::net::TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(tiberius::Client::connect(config, tcp.compat_write()).await?)
}

#[tokio::test]
#[ignore = "requires SQL Server"]
async fn test_catalog_lists_and_fetches_procedures() {
    prepare_database().await.expect("Failed to prepare test database");

    let mut catalog = SqlServerCatalog::connect(&settings(TEST_DATABASE))
        .await
        .expect("Failed to connect");
    let procedures = catalog.procedure_names().await.expect("Failed to list procedures");

    let leaky = ProcedureName {
        schema: "dbo".to_string(),
        name: "usp_Leaky".to_string(),
    };
    assert!(procedures.contains(&leaky));

    let definition = catalog
        .procedure_definition(&leaky)
        .await
        .expect("Failed to fetch definition")
        .expect("Definition should not be empty");
    assert!(definition.contains("#Kept"));
}

#[tokio::test]
#[ignore = "requires SQL Server"]
async fn test_missing_procedure_has_no_definition() {
    prepare_database().await.expect("Failed to prepare test database");

    let mut catalog = SqlServerCatalog::connect(&settings(TEST_DATABASE))
        .await
        .expect("Failed to connect");
    let missing = ProcedureName {
        schema: "dbo".to_string(),
        name: "usp_DoesNotExist".to_string(),
    };

    let definition = catalog.procedure_definition(&missing).await.unwrap();
    assert!(definition.is_none());
}

#[tokio::test]
#[ignore = "requires SQL Server"]
async fn test_run_audit_writes_report() {
    prepare_database().await.expect("Failed to prepare test database");

    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("audit.xlsx");
    let summary = run_audit(AuditOptions {
        connection: settings(TEST_DATABASE),
        output_path: output_path.clone(),
        jobs: None,
    })
    .await
    .expect("Audit failed");

    assert_eq!(summary.outcome.findings.len(), 1);
    assert_eq!(summary.outcome.findings[0].procedure, "dbo.usp_Leaky");
    assert_eq!(summary.outcome.findings[0].orphaned, names(&["#Kept"]));
    assert!(output_path.exists());
}

#[tokio::test]
#[ignore = "requires SQL Server"]
async fn test_bad_credentials_are_fatal() {
    let mut bad = settings(TEST_DATABASE);
    bad.password = "definitely-wrong".to_string();

    let result = SqlServerCatalog::connect(&bad).await;
    assert!(result.is_err());
}
