pub mod http;

pub use http::{HttpGateway, HttpGatewayConfig};
