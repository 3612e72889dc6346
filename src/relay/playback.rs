//! IVF file playback
//!
//! Streams a prerecorded IVF video file onto the shared sample track, one
//! frame per tick of a timer derived from the file's declared time-base.
//! Reaching end-of-sequence reports graceful completion; this is a one-shot
//! demo pipeline, not a loop.

use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use webrtc::media::io::ivf_reader::IVFReader;
use webrtc::media::Sample;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::{MediaError, Result};
use crate::shutdown::ShutdownHandle;

/// Playback pacing from the IVF header's rational time-base:
/// `1000 × numerator / denominator` milliseconds per frame.
pub fn timebase_interval(numerator: u32, denominator: u32) -> Duration {
    if denominator == 0 {
        return Duration::from_millis(1000);
    }
    let millis = (f64::from(numerator) / f64::from(denominator) * 1000.0) as u64;
    // a zero period would stall the timer
    Duration::from_millis(millis.max(1))
}

/// Framed video source backed by the engine's IVF reader
pub struct IvfSource<R: Read> {
    reader: IVFReader<R>,
    interval: Duration,
}

impl<R: Read> IvfSource<R> {
    pub fn new(input: R) -> Result<Self> {
        let (reader, header) =
            IVFReader::new(input).map_err(|e| MediaError::FrameParse(e.to_string()))?;
        Ok(Self {
            reader,
            interval: timebase_interval(header.timebase_numerator, header.timebase_denominator),
        })
    }

    pub fn frame_interval(&self) -> Duration {
        self.interval
    }

    /// Next encoded frame, or `None` at end-of-sequence.
    ///
    /// Only a clean end-of-file counts as end-of-sequence; a hard read error
    /// mid-file (disk failure, lost permissions) is a media error and must
    /// not reach the graceful completion path.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        match self.reader.parse_next_frame() {
            Ok((frame, _header)) => Ok(Some(Bytes::from(frame))),
            Err(e @ webrtc::media::Error::Io(_)) => {
                if is_end_of_file(&e) {
                    Ok(None)
                } else {
                    Err(MediaError::FrameRead(e.to_string()).into())
                }
            }
            Err(e) => Err(MediaError::FrameParse(e.to_string()).into()),
        }
    }
}

/// A frame header read that hit end-of-file is the normal end of the
/// sequence; any other I/O failure is not.
fn is_end_of_file(e: &webrtc::media::Error) -> bool {
    let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = cause {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::UnexpectedEof;
        }
        cause = err.source();
    }
    false
}

/// Stream the whole file, then report completion through `shutdown`
pub async fn play_file(
    path: &Path,
    track: Arc<TrackLocalStaticSample>,
    shutdown: ShutdownHandle,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .map_err(|e| MediaError::FileOpen(format!("{}: {e}", path.display())))?;
    let mut source = IvfSource::new(BufReader::new(file))?;

    let interval = source.frame_interval();
    tracing::info!(
        "Streaming {} at one frame per {:?}",
        path.display(),
        interval
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                let Some(frame) = source.next_frame()? else {
                    tracing::info!("All video frames parsed and sent");
                    shutdown.complete();
                    return Ok(());
                };
                track
                    .write_sample(&Sample {
                        data: frame,
                        duration: Duration::from_secs(1),
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| MediaError::SampleWrite(e.to_string()))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ivf_bytes(frames: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"DKIF");
        out.extend_from_slice(&0u16.to_le_bytes()); // version
        out.extend_from_slice(&32u16.to_le_bytes()); // header length
        out.extend_from_slice(b"VP80");
        out.extend_from_slice(&640u16.to_le_bytes()); // width
        out.extend_from_slice(&480u16.to_le_bytes()); // height
        out.extend_from_slice(&30u32.to_le_bytes()); // timebase denominator
        out.extend_from_slice(&1u32.to_le_bytes()); // timebase numerator
        out.extend_from_slice(&(frames.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // unused
        for (i, frame) in frames.iter().enumerate() {
            out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
            out.extend_from_slice(&(i as u64).to_le_bytes());
            out.extend_from_slice(frame);
        }
        out
    }

    #[test]
    fn test_timebase_interval() {
        // 30 fps source ticks roughly every 33 ms
        assert_eq!(timebase_interval(1, 30), Duration::from_millis(33));
        assert_eq!(timebase_interval(1, 1), Duration::from_millis(1000));
        assert_eq!(timebase_interval(1, 0), Duration::from_millis(1000));
    }

    #[test]
    fn test_frames_read_in_order_until_end() {
        let data = ivf_bytes(&[b"first", b"second"]);
        let mut source = IvfSource::new(Cursor::new(data)).unwrap();

        assert_eq!(source.frame_interval(), Duration::from_millis(33));
        assert_eq!(
            source.next_frame().unwrap().unwrap(),
            Bytes::from_static(b"first")
        );
        assert_eq!(
            source.next_frame().unwrap().unwrap(),
            Bytes::from_static(b"second")
        );
        assert!(source.next_frame().unwrap().is_none());
    }

    /// Delivers its inner bytes, then fails hard instead of reporting
    /// end-of-file
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "lost access to media file",
                ));
            }
            Ok(n)
        }
    }

    #[test]
    fn test_hard_read_error_is_not_end_of_sequence() {
        let reader = FailingReader {
            data: Cursor::new(ivf_bytes(&[b"first"])),
        };
        let mut source = IvfSource::new(reader).unwrap();

        assert_eq!(
            source.next_frame().unwrap().unwrap(),
            Bytes::from_static(b"first")
        );
        let result = source.next_frame();
        assert!(matches!(
            result,
            Err(crate::Error::Media(MediaError::FrameRead(_)))
        ));
    }

    #[test]
    fn test_garbage_header_rejected() {
        let source = IvfSource::new(Cursor::new(b"XXXX nonsense".to_vec()));
        assert!(source.is_err());
    }
}
