//! HTTP transport for the Borealis pricing and space-weather backend.

pub mod http;

pub use http::{ClientError, HttpPricingClient};
