use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Fetch;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Request, Parse, Dedup, Commit }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Request => "request",
        Phase::Parse => "parse",
        Phase::Dedup => "dedup",
        Phase::Commit => "commit",
    }}
    fn span(&self) -> Span { match self {
        Phase::Request => info_span!("request"),
        Phase::Parse => info_span!("parse"),
        Phase::Dedup => info_span!("dedup"),
        Phase::Commit => info_span!("commit"),
    }}
}

impl OpMarker for Fetch {
    const NAME: &'static str = "fetch";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("fetch") }
}
