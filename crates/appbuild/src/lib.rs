//! Website-to-Android build model
//!
//! Request validation, the build status state machine and the build record
//! that the gateway mirrors from the cloud build provider.

mod ids;
mod record;
mod request;
mod status;
mod validate;

pub use ids::{new_local_id, LOCAL_ID_LEN};
pub use record::{format_duration, BuildRecord, LogEntry, LogLevel, ProviderSnapshot, Transition};
pub use request::{BuildRequest, BuildSpec, BuildType, ParseBuildTypeError, RequestField};
pub use status::{BuildStatus, ParseStatusError};
pub use validate::{is_valid_package_name, validate, APP_NAME_MAX_CHARS};
