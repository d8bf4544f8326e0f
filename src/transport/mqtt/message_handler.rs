//! Pure routing of rumqttc events
//!
//! Translates raw event-loop output into [`EventRoute`] decisions that the
//! driver task acts on. Nothing here touches the network.

use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::{
    ConnectReturnCode, Packet, PubAckReason, PubCompReason, SubscribeReasonCode,
};
use rumqttc::v5::Event;
use rumqttc::Outgoing;

/// Routing decision for one event-loop event
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Broker accepted the connection
    ConnectionAcknowledged,
    /// Broker answered CONNECT with a failure code
    ConnectionRefused(String),
    /// Application message on a subscribed topic
    MessageReceived { topic: String, payload: Bytes },
    /// SUBACK for the given packet id
    SubscriptionAcknowledged { packet_id: u16, granted: bool },
    /// PUBACK or PUBCOMP, the end of a QoS 1 or QoS 2 delivery
    PublishCompleted { packet_id: u16 },
    /// PUBACK or PUBCOMP carrying a failure reason
    PublishRejected { packet_id: u16, reason: String },
    /// Broker-initiated DISCONNECT
    Disconnected(String),
    /// Our own DISCONNECT has been written
    DisconnectSent,
    /// Ping traffic, UNSUBACK and the like
    InfrastructureEvent(String),
    OutgoingEvent,
}

pub struct MessageHandler;

impl MessageHandler {
    /// Route an MQTT v5 event (pure function)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(connack) => match connack.code {
                    ConnectReturnCode::Success => EventRoute::ConnectionAcknowledged,
                    code => EventRoute::ConnectionRefused(format!("{code:?}")),
                },
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: String::from_utf8_lossy(&publish.topic).to_string(),
                    payload: publish.payload.clone(),
                },
                Packet::SubAck(suback) => EventRoute::SubscriptionAcknowledged {
                    packet_id: suback.pkid,
                    granted: Self::subscription_granted(&suback.return_codes),
                },
                Packet::PubAck(puback) if Self::publish_accepted(&puback.reason) => {
                    EventRoute::PublishCompleted {
                        packet_id: puback.pkid,
                    }
                }
                Packet::PubAck(puback) => EventRoute::PublishRejected {
                    packet_id: puback.pkid,
                    reason: format!("{:?}", puback.reason),
                },
                Packet::PubComp(pubcomp) => match pubcomp.reason {
                    PubCompReason::Success => EventRoute::PublishCompleted {
                        packet_id: pubcomp.pkid,
                    },
                    reason => EventRoute::PublishRejected {
                        packet_id: pubcomp.pkid,
                        reason: format!("{reason:?}"),
                    },
                },
                Packet::Disconnect(disconnect) => {
                    EventRoute::Disconnected(format!("{:?}", disconnect.reason_code))
                }
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(Outgoing::Disconnect) => EventRoute::DisconnectSent,
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// No matching subscribers still counts as accepted by the broker
    pub fn publish_accepted(reason: &PubAckReason) -> bool {
        matches!(
            reason,
            PubAckReason::Success | PubAckReason::NoMatchingSubscribers
        )
    }

    /// A SUBACK grants the subscription only if every filter succeeded
    pub fn subscription_granted(codes: &[SubscribeReasonCode]) -> bool {
        !codes.is_empty()
            && codes
                .iter()
                .all(|code| matches!(code, SubscribeReasonCode::Success(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::v5::mqttbytes::v5::{
        ConnAck, Disconnect, DisconnectReasonCode, PubAck, PubComp, Publish, SubAck,
    };
    use rumqttc::v5::mqttbytes::QoS;

    #[test]
    fn test_route_connack() {
        let connack = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
            properties: None,
        }));
        assert_eq!(
            MessageHandler::route_mqtt_event(&connack),
            EventRoute::ConnectionAcknowledged
        );

        let refused = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::NotAuthorized,
            properties: None,
        }));
        assert!(matches!(
            MessageHandler::route_mqtt_event(&refused),
            EventRoute::ConnectionRefused(_)
        ));
    }

    #[test]
    fn test_route_publish_keeps_payload_bytes() {
        let publish = Event::Incoming(Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: Bytes::from("T"),
            pkid: 0,
            payload: Bytes::from_static(&[0xAB, 0xCD]),
            properties: None,
        }));

        assert_eq!(
            MessageHandler::route_mqtt_event(&publish),
            EventRoute::MessageReceived {
                topic: "T".to_string(),
                payload: Bytes::from_static(&[0xAB, 0xCD]),
            }
        );
    }

    #[test]
    fn test_route_acks() {
        let suback = Event::Incoming(Packet::SubAck(SubAck {
            pkid: 3,
            return_codes: vec![SubscribeReasonCode::Success(QoS::AtMostOnce)],
            properties: None,
        }));
        assert_eq!(
            MessageHandler::route_mqtt_event(&suback),
            EventRoute::SubscriptionAcknowledged {
                packet_id: 3,
                granted: true
            }
        );

        let puback = Event::Incoming(Packet::PubAck(PubAck {
            pkid: 9,
            reason: PubAckReason::Success,
            properties: None,
        }));
        assert_eq!(
            MessageHandler::route_mqtt_event(&puback),
            EventRoute::PublishCompleted { packet_id: 9 }
        );
    }

    #[test]
    fn test_route_rejected_publish_acks() {
        let denied = Event::Incoming(Packet::PubAck(PubAck {
            pkid: 7,
            reason: PubAckReason::NotAuthorized,
            properties: None,
        }));
        assert!(matches!(
            MessageHandler::route_mqtt_event(&denied),
            EventRoute::PublishRejected { packet_id: 7, reason } if reason.contains("NotAuthorized")
        ));

        let unmatched = Event::Incoming(Packet::PubAck(PubAck {
            pkid: 8,
            reason: PubAckReason::NoMatchingSubscribers,
            properties: None,
        }));
        assert_eq!(
            MessageHandler::route_mqtt_event(&unmatched),
            EventRoute::PublishCompleted { packet_id: 8 }
        );

        let lost = Event::Incoming(Packet::PubComp(PubComp {
            pkid: 11,
            reason: PubCompReason::PacketIdentifierNotFound,
            properties: None,
        }));
        assert!(matches!(
            MessageHandler::route_mqtt_event(&lost),
            EventRoute::PublishRejected { packet_id: 11, .. }
        ));
    }

    #[test]
    fn test_route_disconnects() {
        let disconnect = Event::Incoming(Packet::Disconnect(Disconnect {
            reason_code: DisconnectReasonCode::ServerShuttingDown,
            properties: None,
        }));
        assert!(matches!(
            MessageHandler::route_mqtt_event(&disconnect),
            EventRoute::Disconnected(reason) if reason.contains("ServerShuttingDown")
        ));

        assert_eq!(
            MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::Disconnect)),
            EventRoute::DisconnectSent
        );
        assert_eq!(
            MessageHandler::route_mqtt_event(&Event::Outgoing(Outgoing::PingReq)),
            EventRoute::OutgoingEvent
        );
    }

    #[test]
    fn test_subscription_granted() {
        assert!(MessageHandler::subscription_granted(&[
            SubscribeReasonCode::Success(QoS::AtLeastOnce)
        ]));
        assert!(!MessageHandler::subscription_granted(&[
            SubscribeReasonCode::Success(QoS::AtLeastOnce),
            SubscribeReasonCode::NotAuthorized,
        ]));
        assert!(!MessageHandler::subscription_granted(&[]));
    }
}
