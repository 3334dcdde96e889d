pub mod ports;
pub mod use_cases;

pub use ports::{InstrumentRepository, OrderRepository, PriceFeed, PublishError, SnapshotPublisher};
pub use use_cases::{SubmitOrderError, SubmitOrderUseCase};
