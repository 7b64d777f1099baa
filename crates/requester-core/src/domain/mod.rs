//! Domain model (task description, normalized output, envelope, phases, errors).

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;

pub use self::envelope::ResultEnvelope;
pub use self::errors::{RequestError, TransportError, ValidationError};
pub use self::ids::{RunId, WorkflowIdentity};
pub use self::outcome::{RequestOutput, flatten_headers, parse_body};
pub use self::state::Phase;
pub use self::task::{RequestInputs, TaskDescription};
