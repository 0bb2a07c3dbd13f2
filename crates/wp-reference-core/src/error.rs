use thiserror::Error;
use wp_reference_client::ClientError;

/// Terminal failures of a reference lookup.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Please enter search keyword. e.g : 'wp-reference absint'.")]
    EmptyKeyword,
    #[error("Error connecting with WordPress Reference. Please check your internet connection and try again.")]
    Connectivity(#[source] ClientError),
    #[error("Search not found in WordPress Reference.")]
    NotFound,
    #[error("Could not access to WordPress Reference Page. Please try again.")]
    MalformedPage,
    #[error("Your search history is empty.")]
    EmptyHistory,
    #[error(transparent)]
    Cache(#[from] anyhow::Error),
}

pub type Result<T, E = ReferenceError> = std::result::Result<T, E>;
