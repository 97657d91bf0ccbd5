use chrono::NaiveDateTime;
use rumqttc::Publish;
use std::fmt;

const PREVIEW_CHARS: usize = 32;

/// One inbound publish, decoded once and handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: NaiveDateTime,
}

impl fmt::Display for MqttMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.payload.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if self.payload.chars().count() > PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        write!(
            f,
            "{} - {}: {}{}",
            self.timestamp.format("%H:%M:%S"),
            self.topic,
            preview,
            ellipsis
        )
    }
}

impl MqttMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        MqttMessage {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub fn from_publish(publish: &Publish) -> Self {
        Self::from_topic(
            publish.topic.clone(),
            String::from_utf8_lossy(&publish.payload).into_owned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::QoS;

    #[test]
    fn decodes_publish_payload_lossily() {
        let publish = Publish::new("home/nf2/switch", QoS::AtLeastOnce, vec![b'o', b'n', 0xff]);
        let message = MqttMessage::from_publish(&publish);

        assert_eq!(message.topic, "home/nf2/switch");
        assert!(message.payload.starts_with("on"));
    }

    #[test]
    fn display_truncates_long_payloads() {
        let message = MqttMessage::from_topic("home/nf2/errors", "x".repeat(100));
        let rendered = message.to_string();

        assert!(rendered.contains("home/nf2/errors"));
        assert!(rendered.ends_with("..."));
        assert!(!rendered.contains(&"x".repeat(33)));
    }
}
