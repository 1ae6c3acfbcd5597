use async_trait::async_trait;
use tokio_postgres::{NoTls, SimpleQueryMessage};
use tracing::debug;

use super::{ConnectionDescriptor, DriverError, QueryExecutor, TextRow};

/// `QueryExecutor` backed by tokio-postgres
///
/// Opens a fresh connection per query. Probes run once per interval, so a
/// cached connection would only hide reconnect failures.
#[derive(Debug, Default, Clone)]
pub struct PostgresExecutor;

impl PostgresExecutor {
    pub fn new() -> Self {
        Self
    }

    fn pg_config(descriptor: &ConnectionDescriptor) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&descriptor.host)
            .port(descriptor.port)
            .user(&descriptor.user)
            .password(&descriptor.password)
            .dbname(&descriptor.database)
            .application_name("pg_status")
            .connect_timeout(descriptor.connect_timeout);
        config
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn query_row(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<TextRow, DriverError> {
        let (client, connection) = Self::pg_config(descriptor)
            .connect(NoTls)
            .await
            .map_err(|e| DriverError::Connect(e.to_string()))?;

        let addr = descriptor.addr();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(addr = %addr, error = %e, "Connection closed with error");
            }
        });

        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| DriverError::Query(e.to_string()))?;

        messages
            .iter()
            .find_map(|m| match m {
                SimpleQueryMessage::Row(row) => {
                    Some((0..row.len()).map(|i| row.get(i)).collect::<TextRow>())
                }
                _ => None,
            })
            .ok_or(DriverError::NoRows)
    }
}
