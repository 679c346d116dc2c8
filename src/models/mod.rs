mod news;
mod sentiment;
mod ticker;

pub use news::Article;
pub use sentiment::{
    CycleReport, SentimentAggregate, SentimentHistoryPoint, SentimentSample, TickerOutcome,
    TickerStage, TickerStatus,
};
pub use ticker::{TickerSymbol, TickerUniverse, TrackedTicker};
