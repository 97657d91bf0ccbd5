use super::error::SessionError;
use rumqttc::{AsyncClient, QoS};

/// Outbound half of the broker session.
///
/// Publishing is fire-and-forget: `Ok` means the request was queued, not
/// that the broker acknowledged it. Implementations must be safe to call
/// from several tasks at once.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool)
        -> Result<(), SessionError>;

    /// Non-retained text at least once, the default for replies and telemetry.
    fn publish_text(&self, topic: &str, payload: &str) -> Result<(), SessionError> {
        self.publish(topic, payload.as_bytes(), QoS::AtLeastOnce, false)
    }
}

impl Publisher for AsyncClient {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), SessionError> {
        self.try_publish(topic, qos, retain, payload.to_vec())?;
        Ok(())
    }
}
