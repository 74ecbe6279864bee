//! Numerical root finding used by IRR and breakeven solving

mod brent;

pub use brent::find_root;
