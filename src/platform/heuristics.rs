//! Detection of n-transform results that failed silently
//!
//! The n-transform script can fail without raising: it may echo its input,
//! return an exception marker, or return a watchdog value built from the
//! original `n`. Only an empty result is rejected; flagged values are still
//! applied.

/// Prefix of values produced when the n function caught an exception
pub const EXCEPTION_MARKER_PREFIX: &str = "enhanced_except_";

/// Token joining the watchdog suffix to the original `n`
pub const WATCHDOG_TOKEN: &str = "_w8_";

/// Classification of an n-transform result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NTransformVerdict {
    /// No value came back; `n` stays untouched
    Faulty,
    /// The value equals the input; applied but suspicious
    ShortCircuited,
    /// Exception marker or watchdog value; applied but the function did not finish
    Incomplete,
    /// A genuinely transformed value
    Transformed,
}

impl NTransformVerdict {
    /// Whether the returned value replaces `n`
    pub fn applies(self) -> bool {
        !matches!(self, NTransformVerdict::Faulty)
    }

    /// Warning text for degraded verdicts
    pub fn warning(self) -> Option<&'static str> {
        match self {
            NTransformVerdict::Faulty => {
                Some("Transformed n parameter is empty, n function possibly faulty")
            }
            NTransformVerdict::ShortCircuited => Some(
                "Transformed n parameter is the same as input, n function possibly short-circuited",
            ),
            NTransformVerdict::Incomplete => {
                Some("N function did not complete due to exception")
            }
            NTransformVerdict::Transformed => None,
        }
    }
}

/// Classify the output of the n-transform for input `n`
pub fn classify_n_result(n: &str, output: Option<&str>) -> NTransformVerdict {
    let output = match output {
        Some(output) if !output.is_empty() => output,
        _ => return NTransformVerdict::Faulty,
    };

    if output == n {
        NTransformVerdict::ShortCircuited
    } else if output.starts_with(EXCEPTION_MARKER_PREFIX) || is_watchdog_value(n, output) {
        NTransformVerdict::Incomplete
    } else {
        NTransformVerdict::Transformed
    }
}

fn is_watchdog_value(n: &str, output: &str) -> bool {
    output
        .strip_suffix(n)
        .is_some_and(|head| head.ends_with(WATCHDOG_TOKEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_faulty() {
        assert_eq!(classify_n_result("abc123", None), NTransformVerdict::Faulty);
        assert_eq!(classify_n_result("abc123", Some("")), NTransformVerdict::Faulty);
        assert!(!NTransformVerdict::Faulty.applies());
        assert!(NTransformVerdict::Faulty.warning().is_some());
    }

    #[test]
    fn test_echo_is_short_circuited() {
        let verdict = classify_n_result("abc123", Some("abc123"));
        assert_eq!(verdict, NTransformVerdict::ShortCircuited);
        assert!(verdict.applies());
        assert!(verdict.warning().is_some());
    }

    #[test]
    fn test_exception_marker() {
        let verdict = classify_n_result("abc123", Some("enhanced_except_xyz"));
        assert_eq!(verdict, NTransformVerdict::Incomplete);
        assert!(verdict.applies());
        assert!(verdict.warning().is_some());
    }

    #[test]
    fn test_watchdog_suffix() {
        assert_eq!(
            classify_n_result("abc123", Some("AAAAA_w8_abc123")),
            NTransformVerdict::Incomplete
        );
        // the suffix must carry the original n
        assert_eq!(
            classify_n_result("abc123", Some("AAAAA_w8_zzz999")),
            NTransformVerdict::Transformed
        );
    }

    #[test]
    fn test_regular_transform() {
        let verdict = classify_n_result("N0", Some("N1"));
        assert_eq!(verdict, NTransformVerdict::Transformed);
        assert!(verdict.applies());
        assert_eq!(verdict.warning(), None);
    }
}
