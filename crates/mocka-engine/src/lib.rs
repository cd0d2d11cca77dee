//! Mocka engine: per-origin, per-path HTTP mock resolution and request
//! interception.
//!
//! A hierarchical rule set (groups of endpoints, each with enable flags and
//! an owning origin) is flattened into an ordered lookup table; outgoing
//! requests are matched against it with a parameter-aware path algorithm,
//! and two interceptor styles fabricate responses for matches while passing
//! everything else through untouched. A separate synchronizer mirrors the
//! same rule set into a persistent declarative redirect-rule list for
//! interception that acts before any client code runs.

pub mod config;
pub mod declarative;
pub mod flatten;
pub mod interceptor;
pub mod matcher;
pub mod resolver;
pub mod response;
pub mod rules;

pub use config::{ConfigHandle, MockConfig, MockEngine};
pub use declarative::{rule_id, DeclarativeRule, RuleStore, RuleSynchronizer};
pub use flatten::{flatten, flatten_all, FlatMockTable};
pub use interceptor::fetch::{FetchRequest, FetchTransport, MockFetch, ReqwestTransport};
pub use interceptor::xhr::{MockXhr, ReadyState, XhrInterceptor, XhrUpstream};
pub use matcher::path_matches;
pub use resolver::InterceptorConfig;
pub use rules::{EndpointRule, GroupIndex, GroupRule, RuleSet};
