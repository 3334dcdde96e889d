use async_trait::async_trait;

use crate::shutdown::Shutdown;

/// A source of price observations
///
/// A feed writes observations into the instrument store and publishes a
/// full snapshot downstream after each batch. Exactly one feed is selected
/// at startup; the store and the hub do not care which.
#[async_trait]
pub trait PriceFeed: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Run until `shutdown` fires or the feed has nothing more to do
    async fn run(&mut self, shutdown: Shutdown);
}
