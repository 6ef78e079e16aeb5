pub mod demo;
pub mod feed;

pub use demo::DemoFeed;
pub use feed::{FeedSource, FeedSubscription, LiveFeed, ReadingEvent};
