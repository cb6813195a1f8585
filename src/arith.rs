//! Digit-level arithmetic that does not need the transform: signed addition
//! and subtraction, and multiplication or division by a machine integer.
//!
//! All routines are inherent methods on [`Precision`](crate::Precision) and
//! write into an output distinct from their inputs.

mod add;
mod scalar;
