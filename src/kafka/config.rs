use anyhow::Result;
use msgproc_config::KafkaConfig;
use rdkafka::config::ClientConfig;
use tracing::info;

/// Creates a new `rdkafka::config::ClientConfig` from the application's `KafkaConfig`.
///
/// Shared by the producer and the consumer so both connect the same way:
/// - bootstrap servers
/// - SSL/TLS when `ssl_enabled` is true (optionally with a custom CA)
/// - SASL authentication when mechanism, username and password are all set
pub fn create_client_config(config: &KafkaConfig) -> Result<ClientConfig> {
    let brokers = config.broker_list();
    if brokers.is_empty() {
        anyhow::bail!("KAFKA_BROKERS must name at least one broker");
    }

    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", brokers.join(","));

    // Default to plaintext if SSL is not explicitly enabled and no SASL.
    client_config.set("security.protocol", "plaintext");

    if config.ssl_enabled {
        info!("Enabling SSL/TLS for Kafka connection");
        client_config.set("security.protocol", "ssl");

        if let Some(ca_location) = &config.ssl_ca_location {
            client_config.set("ssl.ca.location", ca_location);
        }
    }

    if let (Some(mechanism), Some(username), Some(password)) = (
        &config.sasl_mechanism,
        &config.sasl_username,
        &config.sasl_password,
    ) {
        info!(sasl_mechanism = %mechanism, "Configuring SASL authentication");
        client_config
            .set("sasl.mechanism", mechanism)
            .set("sasl.username", username)
            .set("sasl.password", password);

        if config.ssl_enabled {
            client_config.set("security.protocol", "sasl_ssl");
        } else {
            client_config.set("security.protocol", "sasl_plaintext");
        }
    }

    Ok(client_config)
}
