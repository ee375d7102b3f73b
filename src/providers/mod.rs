pub mod coingecko;
pub mod currencylayer;
pub mod exchangerate_host;
pub mod exchangerates_api;
pub mod util;
