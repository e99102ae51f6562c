use crate::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum TopologyScannerError {
    #[error("The topology scanner has been closed")]
    Closed,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}
impl std::fmt::Debug for TopologyScannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
