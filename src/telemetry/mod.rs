pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn init() -> LogCtx<ops::init::Init> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn feed() -> LogCtx<ops::feed::Feed> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn fetch() -> LogCtx<ops::fetch::Fetch> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn poll() -> LogCtx<ops::poll::Poll> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
