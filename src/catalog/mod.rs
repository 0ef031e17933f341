/// Catalog of users, channels, videos and social relations
///
/// Plain metadata-store access. Anything that also touches blobs lives in
/// `crate::media`.

pub mod channels;
pub mod social;
pub mod users;
pub mod videos;

pub use channels::ChannelManager;
pub use social::SocialManager;
pub use users::{Registration, UserManager};
pub use videos::{NewVideo, VideoRepository};
