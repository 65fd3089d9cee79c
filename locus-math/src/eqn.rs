//! Human-readable equation strings for coefficient vectors.

use crate::locus::LocusError;
use std::fmt::Write;

/// Format a coefficient list as a display equation.
///
/// Produces `"name = c0label0 + c1label1 ..."` with 3-decimal coefficient
/// magnitudes and sign-aware separators (`$-$` for negative terms, matching
/// the plot-label convention downstream). The leading term carries no `+`.
/// Coefficients and exponent labels are paired positionally; the caller
/// supplies them in whatever order the equation should read.
///
/// # Errors
/// [`LocusError::LengthMismatch`] when the two lists differ in length.
pub fn make_eqn_str(
    var_name: &str,
    coeff_list: &[f64],
    exponent_list: &[&str],
) -> Result<String, LocusError> {
    if coeff_list.len() != exponent_list.len() {
        return Err(LocusError::LengthMismatch {
            coeffs: coeff_list.len(),
            exponents: exponent_list.len(),
        });
    }

    let mut eqn = format!("{} = ", var_name);
    for (i, (&coeff, &label)) in coeff_list.iter().zip(exponent_list.iter()).enumerate() {
        let separator = match (i, coeff < 0.0) {
            (0, false) => "",
            (0, true) => "$-$",
            (_, false) => " + ",
            (_, true) => " $-$ ",
        };
        // write! to a String cannot fail
        let _ = write!(eqn, "{}{:.3}{}", separator, coeff.abs(), label);
    }
    Ok(eqn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_term_equation() {
        let eqn = make_eqn_str("P1", &[2.0, -1.5], &["c1", "c2"]).unwrap();
        assert_eq!(eqn, "P1 = 2.000c1 $-$ 1.500c2");
    }

    #[test]
    fn test_leading_negative_coefficient() {
        let eqn = make_eqn_str("P2", &[-0.25, 0.75], &["c1", "c2"]).unwrap();
        assert_eq!(eqn, "P2 = $-$0.250c1 + 0.750c2");
    }

    #[test]
    fn test_constant_term_with_empty_label() {
        let eqn = make_eqn_str("P1", &[0.5, -0.125], &["c1", ""]).unwrap();
        assert_eq!(eqn, "P1 = 0.500c1 $-$ 0.125");
    }

    #[test]
    fn test_length_mismatch() {
        let result = make_eqn_str("P1", &[1.0, 2.0], &["c1"]);
        assert!(matches!(
            result,
            Err(LocusError::LengthMismatch {
                coeffs: 2,
                exponents: 1
            })
        ));
    }
}
