pub mod http_client_factory;
pub mod json_transport;

pub use http_client_factory::HttpClientFactory;
pub use json_transport::HttpJsonTransport;
