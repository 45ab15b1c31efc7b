use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    AsyncPgConnection,
};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    let client = if config.contains("sslmode=disable") {
        let (client, connection) = tokio_postgres::connect(&config, tokio_postgres::NoTls)
            .await
            .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;
        spawn_connection(connection);
        client
    } else {
        // Set up rustls TLS configuration
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        let (client, connection) = tokio_postgres::connect(&config, tls)
            .await
            .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;
        spawn_connection(connection);
        client
    };

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

fn spawn_connection<F>(connection: F)
where
    F: std::future::Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup = Box::new(|url| Box::pin(establish_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

pub async fn get_conn(pool: &DbPool) -> anyhow::Result<Object<AsyncPgConnection>> {
    Ok(pool.get().await?)
}
