//! Origin-system (CRM) adapter.
//!
//! One HTTP client is built per cycle and reused across every call to amortize
//! connection setup over a potentially large batch. All payloads travel in the
//! origin's `{"row": [...]}` envelope except the financial-aid checklist,
//! which its importer only accepts as tab-separated text.

mod client;
mod types;

pub use client::{MAX_ACTION_IDS_PER_FETCH, OriginFeed, SlateClient};
pub use types::*;
