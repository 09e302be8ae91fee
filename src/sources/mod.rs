/// Sources module
///
/// Where new CJ credentials come from: the token-exchange call and the
/// refresher that drives it.

pub mod exchange;
pub mod refresher;
