use crate::domain::{VibroError, VibroResult};
use crate::numerics::vector::{self, Vec3};

/// Parses three whitespace-separated numbers into a unit polarisation vector.
pub fn parse_polarization(text: &str) -> VibroResult<Vec3> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(VibroError::bad_polarization(format!(
            "wrong syntax: expected three numbers, got '{}'",
            text.trim()
        )));
    }
    let mut components = [0.0; 3];
    for (axis, token) in tokens.iter().enumerate() {
        components[axis] = token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| {
                VibroError::bad_polarization(format!("wrong syntax: '{token}' is not a number"))
            })?;
    }
    vector::normalized(&components)
        .ok_or_else(|| VibroError::bad_polarization("polarisation vector must be non-zero"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn accepts_three_numbers() {
        assert_eq!(parse_polarization("0 0 1").ok(), Some([0.0, 0.0, 1.0]));
        let diagonal = parse_polarization(" 1 1 0 ").expect("diagonal should parse");
        assert!((diagonal[0] - 0.5_f64.sqrt()).abs() < 1.0e-12);
    }

    #[test]
    fn rejects_malformed_vectors() {
        for text in ["0 0", "x y z", "0 0 0", "1 2 3 4", ""] {
            let error = parse_polarization(text).expect_err("malformed vector should fail");
            assert_eq!(error.kind(), ErrorKind::BadPolarization, "input '{text}'");
        }
    }
}
