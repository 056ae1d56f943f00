//! Kubernetes-style resource quantity parsing.
//!
//! The optimization service hands desired settings back as quantity
//! strings (`"500m"`, `"0.5Gi"`). The driver reports cores and bytes as
//! plain floats.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UnitsError {
    #[error("empty resource quantity")]
    Empty,
    #[error("invalid resource quantity: {0:?}")]
    Invalid(String),
}

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
];

const DECIMAL_SUFFIXES: [(&str, f64); 7] = [
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
    // The optimization service echoes some memory values back in milli-bytes.
    ("m", 1e-3),
];

/// Convert a CPU quantity (cores, or millicores with an `m` suffix) to cores.
pub fn cpuunits(s: &str) -> Result<f64, UnitsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }
    match s.strip_suffix('m') {
        Some(millis) => Ok(parse_number(millis, s)? / 1000.0),
        None => parse_number(s, s),
    }
}

/// Convert a memory quantity with an optional SI or binary suffix to bytes.
pub fn memunits(s: &str) -> Result<f64, UnitsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }
    for (suffix, multiplier) in BINARY_SUFFIXES.iter().chain(DECIMAL_SUFFIXES.iter()) {
        if let Some(number) = s.strip_suffix(suffix) {
            return Ok(parse_number(number, s)? * multiplier);
        }
    }
    parse_number(s, s)
}

fn parse_number(number: &str, quantity: &str) -> Result<f64, UnitsError> {
    number
        .trim()
        .parse::<f64>()
        .map_err(|_| UnitsError::Invalid(quantity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_millicores() {
        assert_eq!(cpuunits("500m").unwrap(), 0.5);
        assert_eq!(cpuunits("125m").unwrap(), 0.125);
    }

    #[test]
    fn cpu_plain_cores() {
        assert_eq!(cpuunits("2").unwrap(), 2.0);
        assert_eq!(cpuunits("1.5").unwrap(), 1.5);
    }

    #[test]
    fn cpu_rejects_garbage() {
        assert_eq!(cpuunits(""), Err(UnitsError::Empty));
        assert!(matches!(cpuunits("2 cores"), Err(UnitsError::Invalid(_))));
        assert!(matches!(cpuunits("m"), Err(UnitsError::Invalid(_))));
    }

    #[test]
    fn mem_binary_suffix() {
        assert_eq!(memunits("0.5Gi").unwrap(), 0.5 * 1024f64.powi(3));
        assert_eq!(memunits("512Mi").unwrap(), 512.0 * 1024f64.powi(2));
        assert_eq!(memunits("1Ki").unwrap(), 1024.0);
    }

    #[test]
    fn mem_decimal_suffix() {
        assert_eq!(memunits("100M").unwrap(), 100.0 * 1000f64.powi(2));
        assert_eq!(memunits("2G").unwrap(), 2e9);
        assert_eq!(memunits("3K").unwrap(), 3000.0);
    }

    #[test]
    fn mem_milli_suffix() {
        let bytes = memunits("751619276800m").unwrap();
        assert!((bytes - 751_619_276.8).abs() < 1e-3);
    }

    #[test]
    fn mem_plain_bytes() {
        assert_eq!(memunits("1048576").unwrap(), 1_048_576.0);
    }

    #[test]
    fn mem_rejects_garbage() {
        assert!(matches!(memunits("lots"), Err(UnitsError::Invalid(_))));
        assert!(matches!(memunits("Gi"), Err(UnitsError::Invalid(_))));
    }
}
