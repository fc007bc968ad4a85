//! The fixed noise-reduction invocation.
//!
//! The argument list is deliberately non-configurable: the single use case
//! is dampening incidental loud voices and wind while preserving the video
//! losslessly. The video stream is stream-copied; only the audio path is
//! re-encoded, because the filter graph requires decoding it anyway.

/// Name the source bytes are staged under in the engine's file space.
pub const INPUT_NAME: &str = "input.mp4";

/// Name the engine writes its output under.
pub const OUTPUT_NAME: &str = "output.mp4";

/// High-pass at 80 Hz to remove rumble, then adaptive FFT denoising.
///
/// `afftdn` is assumed present in the pinned engine build; there is no
/// fallback filter graph.
pub const AUDIO_FILTER: &str = "highpass=f=80, afftdn";

/// Build the fixed argument list for one noise-reduction run.
pub fn noise_reduction_args() -> Vec<String> {
    [
        "-i",
        INPUT_NAME,
        "-af",
        AUDIO_FILTER,
        "-c:v",
        "copy",
        "-c:a",
        "aac",
        OUTPUT_NAME,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_list_is_fixed() {
        assert_eq!(
            noise_reduction_args(),
            vec![
                "-i",
                "input.mp4",
                "-af",
                "highpass=f=80, afftdn",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "output.mp4",
            ]
        );
    }

    #[test]
    fn video_stream_is_copied_not_reencoded() {
        let args = noise_reduction_args();
        let pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[pos + 1], "copy");
    }
}
