//! Mapping projector: turns a canonical record into either downstream shape.
//!
//! Both projections are pure functions of the record plus the code-mapping
//! table. The creation projection targets the destination's application-intake
//! API; the update projection targets its native stored-procedure updates.
//! Mapping failures surface here, before any network call is made.

mod creation;
mod update;

pub use creation::{
	AddressPayload, CreationPayload, PhonePayload, ProgramPayload, format_phone_number,
	project_creation,
};
pub use update::{UpdatePayload, project_update};
