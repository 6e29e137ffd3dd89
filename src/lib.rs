//! recordfinder - the "find records" blueprint action as a service
//!
//! A request for `/:model` is parsed into a query plan, fetched and counted
//! in parallel against a record store, and answered with a page of records
//! plus an `X-Total-Count` header. Requests made over the socket transport
//! also subscribe the connection to the records they returned.

pub mod blueprint;
pub mod cli;
pub mod http_server;
pub mod observability;
pub mod realtime;
pub mod store;
