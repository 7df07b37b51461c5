pub mod coordinator;
pub mod diagnostics;
pub mod extractor;
pub mod selection;
pub mod transport;
pub mod validation;

pub use coordinator::{Endpoints, SubmissionCoordinator, SubmitOutcome};
pub use diagnostics::{AttemptResult, DiagnosticEntry, DiagnosticSink};
pub use extractor::{ExtractStrategy, ResponseArrayExtractor};
pub use selection::{FieldView, SelectionStore};
pub use transport::{FormPart, FormPayload, HttpTransport, Transport, TransportError, TransportResponse};
