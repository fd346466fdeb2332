//! Minimal AWS client surface: credential discovery, SigV4, and Lambda's
//! `PublishLayerVersion`.

mod credentials;
mod lambda;
mod providers;
mod sigv4;

pub(crate) use credentials::CredentialSource;
pub use lambda::{LambdaPublisher, PublishLayerVersion, PublishedLayer};
