//! Pure connection configuration for the rumqttc transport
//!
//! Address parsing and option building live here so they can be tested
//! without a broker or a runtime.

use crate::transport::{ConnectOptions, QoS, TransportError};
use rumqttc::v5::mqttbytes::QoS as WireQoS;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use url::Url;

/// Broker location parsed from a `scheme://host:port` address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerAddress {
    /// Parse `tcp://`, `mqtt://`, `ssl://` or `mqtts://` addresses
    pub fn parse(address: &str) -> Result<Self, TransportError> {
        let invalid = || TransportError::InvalidAddress(address.to_string());

        let url = Url::parse(address).map_err(|_| invalid())?;
        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "mqtts" => true,
            _ => return Err(invalid()),
        };
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

/// Build rumqttc options for one connect attempt
pub fn configure_mqtt_options(
    address: &BrokerAddress,
    client_id: &str,
    options: &ConnectOptions,
) -> MqttOptions {
    let mut mqtt_options = MqttOptions::new(client_id, address.host.clone(), address.port);

    if address.tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(credentials) = &options.credentials {
        mqtt_options.set_credentials(&credentials.username, &credentials.password);
    }

    mqtt_options.set_clean_start(options.clean_session);
    mqtt_options.set_keep_alive(options.keep_alive);
    mqtt_options.set_max_packet_size(options.max_packet_size);

    mqtt_options
}

/// Map the transport-neutral level onto rumqttc's
pub fn wire_qos(qos: QoS) -> WireQoS {
    match qos {
        QoS::AtMostOnce => WireQoS::AtMostOnce,
        QoS::AtLeastOnce => WireQoS::AtLeastOnce,
        QoS::ExactlyOnce => WireQoS::ExactlyOnce,
    }
}
