//! Feeds and the request-level operations of the service
//!
//! [`FeedAggregator`] builds feeds out of the follow graph and the post pools,
//! [`view`] has the only types in which posts, personas and follow edges
//! leave the service, and [`Social`] ties it all together for the outer
//! layers.

mod aggregator;
mod cache;
mod social;
mod store;
pub mod view;

pub use self::aggregator::{FeedAggregator, FeedError, FeedResult};
pub use self::cache::FeedCache;
pub use self::social::{Social, SocialError, SocialErrorKind, SocialResult};
pub use self::store::FeedStore;
pub use self::view::Feed;

const LOG_TARGET: &str = "masque::feed";
