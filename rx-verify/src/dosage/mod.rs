//! Dosage Checking
//!
//! Unit normalization, frequency interpretation and the age-banded
//! [`DosageValidator`].

pub mod types;
pub mod units;
pub mod frequency;
pub mod validator;

pub use frequency::Frequency;
pub use types::{AgeBand, DosageFinding, DosageVerdict, DoseRange};
pub use units::{convert, convert_dose, parse_dose, Dimension, DoseUnit};
pub use validator::DosageValidator;
