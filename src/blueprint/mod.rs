//! # Blueprint Find Action
//!
//! The "find records" action of the REST blueprint: a request for
//! `/:model` is parsed into a query plan, fetched and counted in parallel,
//! and answered with a page of records plus an `X-Total-Count` header.
//!
//! # Example
//!
//! ```ignore
//! let finder = RecordFinder::new(models, store, BlueprintConfig::default());
//! let ctx = RequestContext::from_url("/user?where={\"age\":{\">\":21}}&sort=name%20DESC", Transport::Http)?;
//! let response = FindResponse::from(finder.find(&ctx).await);
//! ```

pub mod config;
pub mod errors;
pub mod filter;
pub mod finder;
pub mod model;
pub mod parser;
pub mod plan;
pub mod request;
pub mod response;

pub use config::BlueprintConfig;
pub use errors::{ErrorResponse, FindError, FindErrorKind, FindResult};
pub use filter::{FilterExpr, FilterOperator, QueryFilter};
pub use finder::RecordFinder;
pub use model::{AssociationDef, AssociationKind, AttributeDef, AttributeType, ModelDef, ModelRegistry};
pub use plan::{QueryPlan, SortClause, SortDirection, DEFAULT_LIMIT, MAX_LIMIT};
pub use request::{RequestContext, Transport};
pub use response::{FindOutcome, FindResponse, FoundRecords, EXPOSE_HEADERS_HEADER, TOTAL_COUNT_HEADER};
