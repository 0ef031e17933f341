/// Media storage and metadata consistency
///
/// Every operation here spans both stores: blobs are written before the rows
/// that reference them and deleted before those rows are removed.

pub mod deletion;
pub mod query;
pub mod upload;

pub use deletion::{DeletionEngine, DeletionReport};
pub use query::VideoQueries;
pub use upload::{UploadPayload, UploadPipeline, UploadedVideo, VideoUpload};
