use log::{debug, error};
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use std::future::Future;
use tokio::time::Duration;
use tokio_postgres::{Client, NoTls};
use url::Url;

const MAX_RETRIES: usize = 5;
const WAIT_BETWEEN_RETRIES: u64 = 2;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, String> {
    Ok(MakeTlsConnector::new(ssl_connector(sslrootcert_path)?))
}

/// Connector that only trusts server certificates signed by the given CA
fn ssl_connector(sslrootcert_path: &str) -> Result<SslConnector, String> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| format!("SSL builder error: {}", e))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| format!("Error loading CA cert: {}", e))?;

    builder.set_verify(SslVerifyMode::PEER);

    Ok(builder.build())
}

/// Connection string with `sslrootcert` removed, and the certificate path if it was present
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>), String> {
    let url = Url::parse(database_url).map_err(|e| format!("URL parse error: {}", e))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

async fn connect(database_url: &str) -> Result<Client, String> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    // TLS only when a root certificate was given
    match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            Ok(client)
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            Ok(client)
        }
    }
}

/// Connect and run `operation`, retrying both on failure
pub async fn execute_with_retry<T, F, Fut>(database_url: &str, operation: F) -> Result<T, String>
where
    F: Fn(Client) -> Fut,
    Fut: Future<Output = Result<T, tokio_postgres::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match connect(database_url).await {
            Ok(client) => {
                debug!("Connected to database (attempt {})", attempt + 1);
                match operation(client).await {
                    Ok(value) => return Ok(value),
                    Err(e) => error!("Attempt {}: query error: {}", attempt + 1, e),
                }
            }
            Err(e) => error!("Attempt {}: {}", attempt + 1, e),
        }

        if attempt < MAX_RETRIES - 1 {
            tokio::time::sleep(Duration::from_secs(WAIT_BETWEEN_RETRIES)).await;
        }
    }

    Err("Max retries exceeded".into())
}
