//! Result packaging: the one-line text verdict written to the datalake.

/// Fixed human-readable prefix of the result line.
pub const RESULT_PREFIX: &str = "The ID of the recognized person is ";
/// Fixed suffix naming the service variant that produced the result.
pub const RESULT_SUFFIX: &str = " - server";
/// Fixed datalake output name for the packaged result.
pub const RESULT_OUTPUT_NAME: &str = "outfileServer";

/// Render the match verdict as the fixed output byte buffer:
/// prefix + `"True"`/`"False"` + suffix, UTF-8 encoded.
pub fn package_result(matched: bool) -> Vec<u8> {
    let verdict = if matched { "True" } else { "False" };
    format!("{RESULT_PREFIX}{verdict}{RESULT_SUFFIX}").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_matched_exact_bytes() {
        assert_eq!(
            package_result(true),
            b"The ID of the recognized person is True - server".to_vec()
        );
    }

    #[test]
    fn test_package_unmatched_exact_bytes() {
        assert_eq!(
            package_result(false),
            b"The ID of the recognized person is False - server".to_vec()
        );
    }
}
