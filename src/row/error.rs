//! Errors that can arise when building or masking observation rows.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("Asked to randomly mask {requested} channels, but only {available} are unmasked")]
    RandomMaskTooLarge { requested: usize, available: usize },

    #[error("The {what} array has {got} elements, but the wavelength table has {expected} channels")]
    LengthMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
}
