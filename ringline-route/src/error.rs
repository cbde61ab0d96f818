use thiserror::Error;

/// Errors raised while building a routing tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A policy that selects among children was given none.
    #[error("{0} route needs at least one child")]
    NoChildren(&'static str),
    /// A ketama node weight was negative or not finite.
    #[error("node {0:?} has an invalid weight")]
    InvalidWeight(String),
    /// Every ketama node weighs zero.
    #[error("ketama ring has no weighted node")]
    NoWeight,
}
