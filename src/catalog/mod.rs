//! SQL Server procedure catalog
//!
//! Lists the stored procedures of one database and fetches their definitions
//! over a single TDS connection. The connection is owned by
//! [`SqlServerCatalog`] and every query takes `&mut self`, so fetches run one
//! at a time. The audit run only sees the [`ProcedureCatalog`] trait.

use std::fmt;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::error::TempTableFinderError;

/// Type alias for the SQL client
type SqlClient = Client<Compat<TcpStream>>;

const PROCEDURE_NAMES_QUERY: &str = "SELECT ROUTINE_SCHEMA, ROUTINE_NAME \
     FROM INFORMATION_SCHEMA.ROUTINES \
     WHERE ROUTINE_TYPE = 'PROCEDURE' \
     ORDER BY ROUTINE_SCHEMA, ROUTINE_NAME";

// OBJECT_DEFINITION returns the full body; ROUTINE_DEFINITION stops at 4000 characters.
const PROCEDURE_DEFINITION_QUERY: &str =
    "SELECT OBJECT_DEFINITION(OBJECT_ID(QUOTENAME(@P1) + '.' + QUOTENAME(@P2)))";

/// Connection parameters for one SQL Server database
#[derive(Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Accept the server certificate without validation
    pub trust_cert: bool,
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

impl ConnectionSettings {
    /// `host:port` label used in log lines and errors
    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn tiberius_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.database(&self.database);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }
}

/// Schema-qualified stored procedure name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureName {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for ProcedureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Source of stored procedure names and definitions
#[async_trait]
pub trait ProcedureCatalog: Send {
    /// Name of the database this catalog reads from
    fn database(&self) -> &str;

    /// List every stored procedure, ordered by schema and name
    async fn procedure_names(&mut self) -> Result<Vec<ProcedureName>, TempTableFinderError>;

    /// Fetch a procedure definition; `None` when the server returns no text
    /// (e.g. encrypted procedures or missing permissions)
    async fn procedure_definition(
        &mut self,
        procedure: &ProcedureName,
    ) -> Result<Option<String>, TempTableFinderError>;
}

/// Stored procedure catalog backed by a live SQL Server connection
pub struct SqlServerCatalog {
    client: SqlClient,
    database: String,
}

impl SqlServerCatalog {
    /// Connect to SQL Server
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, TempTableFinderError> {
        let config = settings.tiberius_config();

        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            TempTableFinderError::ConnectionIoError {
                server: settings.server(),
                source: e,
            }
        })?;
        tcp.set_nodelay(true)
            .map_err(|e| TempTableFinderError::ConnectionIoError {
                server: settings.server(),
                source: e,
            })?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| TempTableFinderError::ConnectionError {
                server: settings.server(),
                source: e,
            })?;

        Ok(Self {
            client,
            database: settings.database.clone(),
        })
    }
}

#[async_trait]
impl ProcedureCatalog for SqlServerCatalog {
    fn database(&self) -> &str {
        &self.database
    }

    async fn procedure_names(&mut self) -> Result<Vec<ProcedureName>, TempTableFinderError> {
        let database = self.database.clone();
        let list_error = |e: tiberius::error::Error| TempTableFinderError::ProcedureListError {
            database: database.clone(),
            source: e,
        };

        let rows = self
            .client
            .simple_query(PROCEDURE_NAMES_QUERY)
            .await
            .map_err(list_error)?
            .into_first_result()
            .await
            .map_err(list_error)?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            let schema: Option<&str> = row.try_get(0).map_err(list_error)?;
            let name: Option<&str> = row.try_get(1).map_err(list_error)?;
            if let (Some(schema), Some(name)) = (schema, name) {
                names.push(ProcedureName {
                    schema: schema.to_string(),
                    name: name.to_string(),
                });
            }
        }

        Ok(names)
    }

    async fn procedure_definition(
        &mut self,
        procedure: &ProcedureName,
    ) -> Result<Option<String>, TempTableFinderError> {
        let fetch_error = |e: tiberius::error::Error| TempTableFinderError::ProcedureFetchError {
            procedure: procedure.to_string(),
            source: e,
        };

        let row = self
            .client
            .query(
                PROCEDURE_DEFINITION_QUERY,
                &[&procedure.schema.as_str(), &procedure.name.as_str()],
            )
            .await
            .map_err(fetch_error)?
            .into_row()
            .await
            .map_err(fetch_error)?;

        match row {
            Some(row) => {
                let definition: Option<&str> = row.try_get(0).map_err(fetch_error)?;
                Ok(definition.map(str::to_string))
            }
            None => Ok(None),
        }
    }
}
