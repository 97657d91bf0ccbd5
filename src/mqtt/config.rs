use crate::config::BrokerConfig;
use rumqttc::MqttOptions;
use std::time::Duration;

/// Builds the rumqttc options for the single broker session.
pub fn mqtt_options(broker: &BrokerConfig) -> MqttOptions {
    let mut options = MqttOptions::new(broker.client_id.clone(), broker.host.clone(), broker.port);
    options
        .set_keep_alive(Duration::from_secs(broker.keep_alive_secs))
        .set_clean_session(true);

    if !broker.username.is_empty() {
        options.set_credentials(broker.username.clone(), broker.password.clone());
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_carry_identity_and_keep_alive() {
        let broker = BrokerConfig {
            host: "10.0.0.1".to_string(),
            port: 1884,
            client_id: "nf2".to_string(),
            username: "device".to_string(),
            password: "pw".to_string(),
            keep_alive_secs: 15,
            request_capacity: 10,
        };

        let options = mqtt_options(&broker);

        assert_eq!(options.client_id(), "nf2");
        assert_eq!(options.broker_address(), ("10.0.0.1".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(15));
        assert_eq!(
            options.credentials(),
            Some(("device".to_string(), "pw".to_string()))
        );
    }
}
