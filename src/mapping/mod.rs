//! Code-mapping table for translating origin (CRM) vocabulary codes into
//! destination (SIS) vocabulary codes.
//!
//! The table is loaded from the vendor mapping document at the start of a sync
//! cycle and reloaded when auto-configuration appends rows to it. A code with
//! no entry is a hard error for that field; callers that want a default must
//! supply it explicitly.

mod table;

pub use table::{CodeMappingTable, MappingError, autoconfigure_document};
