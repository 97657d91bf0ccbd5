use rumqttc::{ClientError, ConnectionError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Broker connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Client request failed: {0}")]
    Client(#[from] ClientError),
}
