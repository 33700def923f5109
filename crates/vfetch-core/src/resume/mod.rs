//! Resume state for interrupted segmented downloads.
//!
//! While a segmented transfer is incomplete, a control file `<target>.vfetch`
//! sits next to the target. It records the segment plan, which segments are
//! done, and the remote validators seen when the plan was made. It is removed
//! once the file is complete.

mod state;
mod validate;

pub use state::{control_path, ControlFile, ResumeState, CONTROL_SUFFIX};
pub use validate::{validate_for_resume, RemoteChanged};
