//! Maps a finished run's diagnostic log to an error.

use super::error::ConverterError;

const HWACCEL_SIGNATURE: &str = "Unrecognized hwaccel: ";
const BITSTREAM_SIGNATURES: [&str; 2] = ["Unknown bitstream filter", "Error parsing bitstream filter"];
const DECODER_SIGNATURE: &str = "Unknown decoder";

/// Classifies a finished run.
///
/// Known failure signatures win regardless of the exit code. Without one, a
/// non-zero (or missing) exit code is a generic `ConversionFailed`, and exit
/// code 0 is success (`None`).
pub fn classify(diagnostics: &str, arguments: &str, exit_code: Option<i32>) -> Option<ConverterError> {
    if let Some(message) = matching_line(diagnostics, &[HWACCEL_SIGNATURE]) {
        return Some(ConverterError::HardwareAcceleratorNotFound {
            message,
            diagnostics: diagnostics.to_string(),
            arguments: arguments.to_string(),
        });
    }

    if let Some(message) = matching_line(diagnostics, &BITSTREAM_SIGNATURES) {
        return Some(ConverterError::InvalidBitstreamFilter {
            message,
            diagnostics: diagnostics.to_string(),
            arguments: arguments.to_string(),
        });
    }

    if let Some(message) = matching_line(diagnostics, &[DECODER_SIGNATURE]) {
        return Some(ConverterError::UnknownDecoder {
            message,
            diagnostics: diagnostics.to_string(),
            arguments: arguments.to_string(),
        });
    }

    if exit_code == Some(0) {
        return None;
    }

    Some(ConverterError::ConversionFailed {
        exit_code,
        diagnostics: diagnostics.to_string(),
        arguments: arguments.to_string(),
    })
}

/// First log line containing any of `signatures`, trimmed.
fn matching_line(diagnostics: &str, signatures: &[&str]) -> Option<String> {
    diagnostics
        .lines()
        .find(|line| signatures.iter().any(|s| line.contains(s)))
        .map(|line| line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARGS: &str = "-hwaccel foo -i \"a.mp4\" -n -map 0:0 \"b.mp4\"";

    #[test]
    fn test_hwaccel_wins_even_on_success_exit() {
        let log = "ffmpeg version 6.0\nUnrecognized hwaccel: foo.\nSupported hwaccels: cuda\n";
        for code in [Some(0), Some(1), None] {
            let err = classify(log, ARGS, code).unwrap();
            match err {
                ConverterError::HardwareAcceleratorNotFound {
                    message, arguments, ..
                } => {
                    assert_eq!(message, "Unrecognized hwaccel: foo.");
                    assert_eq!(arguments, ARGS);
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_rule_order() {
        let log = "Unknown decoder 'x'\nUnknown bitstream filter y\n";
        assert!(matches!(
            classify(log, ARGS, Some(1)),
            Some(ConverterError::InvalidBitstreamFilter { .. })
        ));
        assert!(matches!(
            classify("Error parsing bitstream filter sequence 'z'", ARGS, Some(1)),
            Some(ConverterError::InvalidBitstreamFilter { .. })
        ));
        assert!(matches!(
            classify("Unknown decoder 'h264_bogus'", ARGS, Some(1)),
            Some(ConverterError::UnknownDecoder { .. })
        ));
    }

    #[test]
    fn test_generic_failure_keeps_full_log() {
        let log = "line one\nline two\n";
        let err = classify(log, ARGS, Some(69)).unwrap();
        assert!(matches!(
            err,
            ConverterError::ConversionFailed {
                exit_code: Some(69),
                ..
            }
        ));
        assert_eq!(err.diagnostics(), Some(log));
        assert_eq!(err.arguments(), Some(ARGS));
    }

    #[test]
    fn test_clean_exit_is_success() {
        assert!(classify("frame=  10 time=00:00:01.00", ARGS, Some(0)).is_none());
    }

    #[test]
    fn test_killed_process_is_failure() {
        assert!(classify("", ARGS, None).is_some());
    }
}
