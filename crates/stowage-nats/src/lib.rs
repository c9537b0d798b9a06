mod client;
mod drain;
mod producer;
mod registry_client;
mod traits;

pub use client::NatsClient;
pub use drain::NatsReadingDrain;
pub use producer::NatsReadingProducer;
pub use registry_client::NatsSensorRegistry;
pub use traits::{JetStreamPublisher, NatsJetStreamPublisher};
