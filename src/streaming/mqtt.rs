// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! MQTT client - fire-and-forget publishes, inbound command intake

use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::StreamingConfig;

/// An inbound publish delivered to the controller loop
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT client wrapper
///
/// All publishes are QoS 0, retain false - the status surface is a live
/// feed, not a retained store. Inbound publishes on subscribed topics are
/// forwarded over the supplied channel; the eventloop task keeps polling
/// through connection errors so periodic publishes resume after a broker
/// outage.
pub struct MqttClient {
    client: AsyncClient,
}

impl MqttClient {
    pub fn connect(config: &StreamingConfig, inbound_tx: mpsc::Sender<InboundMessage>) -> Self {
        let mut options = MqttOptions::new(
            &config.mqtt_client_id,
            &config.mqtt_broker,
            config.mqtt_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let (Some(username), Some(password)) =
            (&config.mqtt_username, &config.mqtt_password)
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        debug!("MQTT received: {:?}", msg.topic);
                        let message = InboundMessage {
                            topic: msg.topic,
                            payload: msg.payload.to_vec(),
                        };
                        if inbound_tx.send(message).await.is_err() {
                            // controller gone, nothing left to deliver to
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        info!(
            "MQTT client initialized for {}:{}",
            config.mqtt_broker, config.mqtt_port
        );
        Self { client }
    }

    pub async fn publish<T: Serialize>(&self, topic: &str, payload: &T) -> Result<()> {
        let json = serde_json::to_vec(payload)?;
        self.publish_raw(topic, json).await
    }

    pub async fn publish_raw(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| anyhow!("MQTT publish failed: {}", e))?;

        Ok(())
    }

    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| anyhow!("MQTT subscribe failed: {}", e))?;

        info!("Subscribed to MQTT topic: {}", topic);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| anyhow!("MQTT disconnect failed: {}", e))?;

        Ok(())
    }
}
