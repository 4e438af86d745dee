pub mod error;
pub mod http;
pub mod json;
pub mod policy;
pub mod transport;

pub use error::{ClientError, FailureKind};
pub use http::{Call, HttpClient, HttpClientConfig};
pub use json::JsonOptions;
pub use policy::{
    Attempt, CircuitBreakerPolicy, Next, RetryPolicy, TransportError, TransportPolicy,
    TransportResult,
};
pub use transport::{PooledTransportFactory, Transport, TransportFactory};
