pub mod field;
pub mod stage;
pub mod upload;

pub use field::{FieldRecord, Position, TransmitField};
pub use stage::Stage;
pub use upload::UploadContext;
