//! CSV export of session history.
//!
//! Motion goes to the requested path with header `time,accel_x,accel_y,accel_z`.
//! Audio goes to a sibling `<stem>_audio.csv` with header `time,db`. Times are
//! RFC 3339; an audio row without a timestamp has an empty `time` cell.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use relay_core::{AudioSample, MotionSample};
use tracing::info;

use crate::buffer::SessionHistory;
use crate::error::Result;

/// Header of the motion table.
pub const MOTION_HEADER: [&str; 4] = ["time", "accel_x", "accel_y", "accel_z"];

/// Header of the audio table.
pub const AUDIO_HEADER: [&str; 2] = ["time", "db"];

/// Files written by [`export_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Motion CSV path
    pub motion_path: PathBuf,
    /// Rows in the motion CSV
    pub motion_rows: usize,
    /// Audio CSV path
    pub audio_path: PathBuf,
    /// Rows in the audio CSV
    pub audio_rows: usize,
}

/// Write motion samples as CSV to any writer.
pub fn write_motion_csv<W: Write>(writer: W, samples: &[MotionSample]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(MOTION_HEADER)?;
    for s in samples {
        csv.write_record(&[
            s.time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            s.ax.to_string(),
            s.ay.to_string(),
            s.az.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write audio samples as CSV to any writer.
pub fn write_audio_csv<W: Write>(writer: W, samples: &[AudioSample]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(AUDIO_HEADER)?;
    for s in samples {
        let time = s
            .time
            .map_or(String::new(), |t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        csv.write_record(&[time, s.db.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Path of the audio table that accompanies `motion_path`.
#[must_use]
pub fn audio_path_for(motion_path: &Path) -> PathBuf {
    let stem = motion_path
        .file_stem()
        .map_or_else(|| "session".into(), |s| s.to_string_lossy().into_owned());
    motion_path.with_file_name(format!("{stem}_audio.csv"))
}

/// Export session history to `path` (motion) and its audio sibling.
///
/// Parent directories are created if missing. Both files are written even
/// when a channel is empty, so a header-only file means "nothing recorded".
pub fn export_session<P: AsRef<Path>>(path: P, history: &SessionHistory) -> Result<ExportSummary> {
    let motion_path = path.as_ref().to_path_buf();
    if let Some(parent) = motion_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let audio_path = audio_path_for(&motion_path);

    write_motion_csv(File::create(&motion_path)?, history.motion())?;
    write_audio_csv(File::create(&audio_path)?, history.audio())?;

    let summary = ExportSummary {
        motion_path,
        motion_rows: history.motion().len(),
        audio_path,
        audio_rows: history.audio().len(),
    };
    info!(
        motion = %summary.motion_path.display(),
        motion_rows = summary.motion_rows,
        audio = %summary.audio_path.display(),
        audio_rows = summary.audio_rows,
        "Session exported"
    );
    Ok(summary)
}
