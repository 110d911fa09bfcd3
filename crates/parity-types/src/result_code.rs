//! Engine-result and RPC-error taxonomy.
//!
//! The retry controller never matches raw code strings at its call sites;
//! everything funnels through [`classify_result`] so the transient /
//! application-level split lives in one table. Negative tests depend on
//! application-level rejections being surfaced verbatim, so the transient
//! set is deliberately narrow.

/// Successful inclusion in the open ledger.
pub const TES_SUCCESS: &str = "tesSUCCESS";
/// Accepted into the transaction queue; will apply in a later ledger.
pub const TER_QUEUED: &str = "terQUEUED";

/// Retry-relevant classification of an engine result or RPC error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    /// `tesSUCCESS`.
    Success,
    /// `terQUEUED` - accepted, pending inclusion.
    Queued,
    /// Open-ledger congestion / fee escalation; retry after a fixed wait.
    Congestion,
    /// The node has no usable ledger yet; retry after the same wait.
    NotSynced,
    /// Sequence already consumed; retry only with a refreshed sequence.
    StaleSequence,
    /// Everything else, including deliberate ledger-rule rejections.
    /// Returned to the caller unchanged, never retried.
    Other,
}

/// Classify an engine result (`tesSUCCESS`, `tec...`) or an RPC error
/// code (`noCurrent`, `actNotFound`, ...) for the retry controller.
pub fn classify_result(code: &str) -> ResultClass {
    match code {
        TES_SUCCESS => ResultClass::Success,
        TER_QUEUED => ResultClass::Queued,
        // Queue/fee escalation under load. `terPRE_SEQ` appears here when a
        // queued predecessor has not applied yet.
        "telCAN_NOT_QUEUE"
        | "telCAN_NOT_QUEUE_FEE"
        | "telCAN_NOT_QUEUE_FULL"
        | "telCAN_NOT_QUEUE_BLOCKS"
        | "telINSUF_FEE_P"
        | "terPRE_SEQ" => ResultClass::Congestion,
        "noCurrent" | "noNetwork" | "notSynced" | "tooBusy" => ResultClass::NotSynced,
        "tefPAST_SEQ" => ResultClass::StaleSequence,
        _ => ResultClass::Other,
    }
}
