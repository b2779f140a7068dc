pub mod github;
pub mod session;

pub use github::{GithubClient, GithubError, GithubUser};
pub use session::{resolve_identity, Identity, SessionCodec};
