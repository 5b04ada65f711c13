pub mod annotation;
pub mod context;
pub mod lookup;
pub mod provider;

pub use annotation::*;
pub use context::*;
pub use lookup::{Lookup, EMPTY};
pub use provider::{GenomicProvider, ProviderError};
