pub mod enriched;
pub mod tick;

pub use enriched::EnrichedTick;
pub use tick::Tick;
