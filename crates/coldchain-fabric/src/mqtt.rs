use anyhow::{bail, Result};
use rumqttc::MqttOptions;
use std::time::Duration;

/// Parse a broker URL in the form mqtt://host:port, tcp://host:port or
/// host:port. The port defaults to 1883.
pub fn parse_broker_url(url: &str) -> Result<(&str, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.len() {
        1 => Ok((parts[0], 1883)),
        2 => {
            let port = parts[1]
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("Invalid port in broker URL: {}", parts[1]))?;
            Ok((parts[0], port))
        }
        _ => bail!("Invalid broker URL format: {}", url),
    }
}

/// Build MQTT options for a coldchain client: clean session, 30 s
/// keep-alive, optional credentials.
pub fn mqtt_options(
    broker_url: &str,
    client_id: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<MqttOptions> {
    let (host, port) = parse_broker_url(broker_url)?;

    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_clean_session(true);

    if let (Some(user), Some(pass)) = (username, password) {
        options.set_credentials(user, pass);
    }

    Ok(options)
}
