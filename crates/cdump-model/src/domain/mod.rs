mod resource;
pub use resource::{LoggableResource, ResourceId};

mod check_status;
pub use check_status::CheckStatus;

mod check_result;
pub use check_result::{CheckResult, DETECTED_MESSAGE, Info, NOT_DETECTED_MESSAGE};

mod check_id;
pub use check_id::{CheckId, ParseCheckIdError};

mod report;
pub use report::Report;
