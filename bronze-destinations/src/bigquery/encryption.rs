use std::sync::Once;

/// Ensures the crypto provider is only installed once.
static INIT_CRYPTO: Once = Once::new();

/// Installs the AWS LC crypto provider as the process wide rustls default.
///
/// The BigQuery client negotiates TLS through rustls, which refuses to pick a provider on its own
/// when several are compiled in. An already installed provider is kept.
pub fn install_crypto_provider_for_bigquery() {
    INIT_CRYPTO.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("a rustls crypto provider was already installed");
        }
    });
}
