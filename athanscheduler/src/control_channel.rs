//! MQTT remote trigger.
//!
//! Messages published below the subscribed filter start a broadcast; the
//! last topic level picks the folder. The payload is ignored.

use crate::broadcaster::Broadcaster;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CLIENT_ID: &str = "athan_pi";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Audio folder requested by a control topic, `None` for unknown topics.
/// `""` is the catalog root.
pub fn folder_for_topic(topic: &str) -> Option<&'static str> {
    if topic.ends_with("fajr") {
        Some("fajr")
    } else if topic.ends_with("morning") {
        Some("morning_adhkar")
    } else if topic.ends_with("normal") {
        Some("")
    } else {
        None
    }
}

/// `tcp://host:port`, `mqtt://host`, `host:port` or `host`
pub fn parse_broker(broker: &str) -> Option<(String, u16)> {
    let address = broker
        .trim()
        .trim_start_matches("tcp://")
        .trim_start_matches("mqtt://")
        .trim_end_matches('/');
    if address.is_empty() {
        return None;
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse::<u16>().ok()?;
            Some((host.to_string(), port))
        }
        Some(_) => None,
        None => Some((address.to_string(), DEFAULT_MQTT_PORT)),
    }
}

/// Runs the subscription until the task is aborted. Connection errors are
/// logged and retried after a short delay; the filter is subscribed again
/// after every (re)connection.
pub async fn run_control_channel(host: String, port: u16, topic_filter: String, broadcaster: Broadcaster) {
    let mut options = MqttOptions::new(CLIENT_ID, host.as_str(), port);
    options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    info!("📡 MQTT control channel on {}:{} ({})", host, port, topic_filter);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                match client.try_subscribe(topic_filter.as_str(), QoS::AtMostOnce) {
                    Ok(()) => info!("✅ MQTT connected, subscribed to {}", topic_filter),
                    Err(e) => warn!("❌ MQTT subscribe to {} failed: {}", topic_filter, e),
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_topic(&publish.topic, &broadcaster);
            }
            Ok(event) => debug!("MQTT event: {:?}", event),
            Err(e) => {
                warn!("⚠️ MQTT connection error: {}, retrying in {:?}", e, RECONNECT_DELAY);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn handle_topic(topic: &str, broadcaster: &Broadcaster) {
    match folder_for_topic(topic) {
        Some(folder) => {
            info!("📨 Remote trigger {} -> folder '{}'", topic, folder);
            broadcaster.request(folder, 0);
        }
        None => debug!("Ignoring MQTT topic {}", topic),
    }
}
