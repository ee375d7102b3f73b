//! Core conversion logic and the abstractions it is built on

pub mod cache;
pub mod config;
pub mod convert;
pub mod currency;
pub mod log;
pub mod market;
pub mod metadata;
pub mod rates;

// Re-export main types for cleaner imports
pub use cache::CryptoSymbolCache;
pub use convert::{ConversionError, ConversionResult, Converter, RateSource};
pub use currency::FiatRateProvider;
pub use market::{MarketDataProvider, PricePoint};
pub use metadata::{CurrencyMetadata, FiatTable};
pub use rates::FiatRateResolver;
