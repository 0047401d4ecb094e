pub mod cancel;
pub mod classify;
pub mod config;
pub mod date;
pub mod fs;
pub mod layout;
pub mod media;
pub mod placement;
pub mod walk;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::date::{DateResult, DateSource, ExifDecoder, MetadataDecoder};
use crate::fs::{FileSystem, RealFs};
use crate::layout::Destination;
use crate::media::MediaFile;

pub use cancel::{CancellationToken, CancelledError};
pub use config::Config;
pub use placement::PlacementOutcome;

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Directory scanned for media, never modified
    pub source: PathBuf,
    /// Root of the chronological tree
    pub output: PathBuf,
    pub config: Config,
}

/// Control options for a run (cancellation).
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// Per-run counters. Every regular file seen lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scanned: u64,
    pub ineligible: u64,
    pub already_linked: u64,
    pub already_up_to_date: u64,
    pub linked: u64,
    pub copied: u64,
    pub skipped: u64,
    /// Copy fallbacks that failed
    pub failed: u64,
    /// Files whose placement raised an error
    #[serde(default)]
    pub errors: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &PlacementOutcome) {
        let counter = match outcome {
            PlacementOutcome::AlreadyLinked => &mut self.already_linked,
            PlacementOutcome::AlreadyUpToDate => &mut self.already_up_to_date,
            PlacementOutcome::Linked => &mut self.linked,
            PlacementOutcome::Copied => &mut self.copied,
            PlacementOutcome::Skipped => &mut self.skipped,
            PlacementOutcome::Failed(_) => &mut self.failed,
        };
        *counter += 1;
    }

    /// Links and copies created by this run.
    pub fn files_written(&self) -> u64 {
        self.linked + self.copied
    }
}

/// Resolves dates and places files into the tree rooted at `output`.
pub struct Organizer<'a, F, D> {
    config: &'a Config,
    output: &'a Path,
    fs: F,
    decoder: D,
}

impl<'a, F: FileSystem, D: MetadataDecoder> Organizer<'a, F, D> {
    pub fn new(config: &'a Config, output: &'a Path, fs: F, decoder: D) -> Self {
        Self {
            config,
            output,
            fs,
            decoder,
        }
    }

    /// Metadata first, then filename conventions, then the default date.
    pub fn resolve_date(&self, file: &MediaFile) -> DateResult {
        let metadata = match self.decoder.capture_date(&file.path) {
            Ok(Some(date)) => Some(date),
            Ok(None) => {
                log::debug!("{}: no date info in metadata", file.path.display());
                None
            }
            Err(e) => {
                if classify::is_video(&file.extension) {
                    log::debug!("{}: no metadata: {:#}", file.path.display(), e);
                } else {
                    log::warn!("{}: {:#}", file.path.display(), e);
                }
                None
            }
        };

        let from_name = date::guess::guess_date_from_filename(&file.filename);
        let resolved = date::resolve(metadata, from_name, self.config.boundary_hour);
        if resolved.source == DateSource::Default {
            log::warn!(
                "{}: no date in metadata or filename, using {}",
                file.path.display(),
                resolved.date
            );
        }
        resolved
    }

    /// Resolve and place a single eligible file.
    pub fn process_file(&self, file: &MediaFile) -> anyhow::Result<PlacementOutcome> {
        let resolved = self.resolve_date(file);
        let dest = Destination::new(self.output, resolved.date, &file.filename);
        log::debug!(
            "{}: dated {} from {:?} -> {}",
            file.path.display(),
            resolved.date,
            resolved.source,
            dest.dir.display()
        );

        let outcome = placement::place(&self.fs, file, &dest)?;
        match outcome {
            PlacementOutcome::Linked => log::info!("linked {} -> {}", file.path.display(), dest.path().display()),
            PlacementOutcome::Copied => log::info!("copied {} -> {}", file.path.display(), dest.path().display()),
            PlacementOutcome::AlreadyLinked | PlacementOutcome::AlreadyUpToDate => {
                log::debug!("{}: already in place ({:?})", file.path.display(), outcome)
            }
            // Reported by the placement engine
            PlacementOutcome::Skipped | PlacementOutcome::Failed(_) => {}
        }
        Ok(outcome)
    }

    /// Walk `source` and place every eligible file. Only an unreadable source
    /// root, an unusable output root or cancellation fail the run.
    pub fn run(
        &self,
        source: &Path,
        cancel_token: Option<&CancellationToken>,
    ) -> anyhow::Result<RunSummary> {
        use anyhow::Context;

        self.fs
            .create_dir_all(self.output)
            .with_context(|| format!("creating output root {}", self.output.display()))?;

        let mut summary = RunSummary::default();
        for entry in walk::media_candidates(source, Some(self.output))? {
            if let Some(token) = cancel_token {
                if let Err(e) = token.check() {
                    log::info!("cancelled after {} files", summary.scanned);
                    return Err(e.into());
                }
            }

            summary.scanned += 1;
            if !classify::is_eligible_path(entry.path(), self.config) {
                log::trace!("{}: not a media extension", entry.path().display());
                summary.ineligible += 1;
                continue;
            }

            let file = match entry.metadata() {
                Ok(meta) => MediaFile::from_metadata(entry.into_path(), &meta),
                Err(e) => Err(anyhow::Error::new(e)
                    .context(format!("reading metadata of {}", entry.path().display()))),
            };
            let file = match file {
                Ok(file) => file,
                Err(e) => {
                    log::error!("{:#}", e);
                    summary.errors += 1;
                    continue;
                }
            };

            log::debug!("processing: {}", file.path.display());
            match self.process_file(&file) {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    log::error!("{}: {:#}", file.path.display(), e);
                    summary.errors += 1;
                }
            }
        }

        log::info!(
            "{} files scanned: {} linked, {} copied, {} already in place, {} skipped, {} failed, {} errors",
            summary.scanned,
            summary.linked,
            summary.copied,
            summary.already_linked + summary.already_up_to_date,
            summary.skipped,
            summary.failed,
            summary.errors
        );
        Ok(summary)
    }
}

/// Run the whole pipeline on the host file system with EXIF decoding.
pub fn organize(options: &ProcessOptions, control: &ProcessControl) -> anyhow::Result<RunSummary> {
    options.config.validate()?;
    Organizer::new(&options.config, &options.output, RealFs, ExifDecoder)
        .run(&options.source, control.cancel_token.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::tests::LinkFailsFs;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::fs::{self, File};
    use std::io::{self, Write};
    use tempfile::{tempdir, TempDir};

    /// Decoder returning the same answer for every file.
    struct FixedDecoder(Option<NaiveDateTime>);

    impl MetadataDecoder for FixedDecoder {
        fn capture_date(&self, _path: &Path) -> anyhow::Result<Option<NaiveDateTime>> {
            match self.0 {
                Some(date) => Ok(Some(date)),
                None => anyhow::bail!("no EXIF block"),
            }
        }
    }

    fn write(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(content).unwrap();
    }

    /// Source tree with one file per date source plus a non-media file.
    fn source_tree() -> (TempDir, PathBuf, PathBuf) {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("20230615_143000.jpg"), b"camera");
        write(&src.join("phone/signal-2022-11-03-09-15-00-video.mp4"), b"signal");
        write(
            &src.join("scans/20230606_060000.tif"),
            &date::exif::tiff_with_datetime("2023:01:01 10:00:00"),
        );
        write(&src.join("misc/IMG_0001.JPG"), b"no date at all");
        write(&src.join("20230615_143000.txt"), b"notes");
        (dir, src, dst)
    }

    fn options(src: &Path, dst: &Path) -> ProcessOptions {
        ProcessOptions {
            source: src.to_path_buf(),
            output: dst.to_path_buf(),
            config: Config::default(),
        }
    }

    #[test]
    fn test_organize_layout() {
        let (_dir, src, dst) = source_tree();
        let summary = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();

        assert_eq!(summary.scanned, 5);
        assert_eq!(summary.ineligible, 1);
        assert_eq!(summary.linked, 4);
        assert_eq!(summary.errors, 0);

        // Filename-only fallback
        assert_eq!(
            fs::read(dst.join("2023/06/2023-06-15_/20230615_143000.jpg")).unwrap(),
            b"camera"
        );
        // Signal convention
        assert!(dst
            .join("2022/11/2022-11-03_/signal-2022-11-03-09-15-00-video.mp4")
            .is_file());
        // Metadata wins over the filename
        assert!(dst.join("2023/01/2023-01-01_/20230606_060000.tif").is_file());
        assert!(!dst.join("2023/06/2023-06-06_").exists());
        // Nothing found: default date, mixed-case extension accepted
        assert!(dst.join("0000/01/0000-01-01_/IMG_0001.JPG").is_file());
        // Extension gating
        assert!(!dst.join("2023/06/2023-06-15_/20230615_143000.txt").exists());
        // Originals untouched
        assert_eq!(fs::read(src.join("20230615_143000.jpg")).unwrap(), b"camera");
    }

    #[test]
    fn test_second_run_does_nothing() {
        let (_dir, src, dst) = source_tree();
        let first = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(first.files_written(), 4);

        let second = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(second.files_written(), 0);
        assert_eq!(second.already_linked + second.already_up_to_date, 4);
        assert_eq!(second.skipped + second.failed + second.errors, 0);
    }

    #[test]
    fn test_new_files_are_picked_up_on_rerun() {
        let (_dir, src, dst) = source_tree();
        organize(&options(&src, &dst), &ProcessControl::new()).unwrap();

        write(&src.join("later/20240101_120000.heic"), b"new");
        let summary = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(summary.linked, 1);
        assert!(dst.join("2024/01/2024-01-01_/20240101_120000.heic").is_file());
    }

    #[test]
    fn test_destination_inside_source() {
        let (_dir, src, _) = source_tree();
        let dst = src.join("organized");
        organize(&options(&src, &dst), &ProcessControl::new()).unwrap();

        let second = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(second.scanned, 5);
        assert_eq!(second.files_written(), 0);
    }

    #[test]
    fn test_same_name_same_day_converges() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("a/IMG_0001.JPG"), b"first camera");
        write(&src.join("b/IMG_0001.JPG"), b"second camera");
        crate::fs::FileSystem::set_modified(
            &RealFs,
            &src.join("b/IMG_0001.JPG"),
            std::time::SystemTime::UNIX_EPOCH,
        )
        .unwrap();
        let placed = dst.join("0000/01/0000-01-01_/IMG_0001.JPG");

        let first = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(first.linked, 1);
        assert_eq!(first.skipped, 1);
        let kept = fs::read(&placed).unwrap();

        for _ in 0..3 {
            let again = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
            assert_eq!(again.files_written(), 0);
            assert_eq!(again.already_linked + again.already_up_to_date + again.skipped, 2);
            assert_eq!(fs::read(&placed).unwrap(), kept);
        }
        // Both originals still there
        assert_eq!(fs::read(src.join("a/IMG_0001.JPG")).unwrap(), b"first camera");
        assert_eq!(fs::read(src.join("b/IMG_0001.JPG")).unwrap(), b"second camera");
    }

    #[test]
    fn test_unusable_metadata_date_falls_back_to_filename() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(
            &src.join("20230615_143000.tif"),
            &date::exif::tiff_with_datetime("0000:00:00 00:00:00"),
        );

        let summary = organize(&options(&src, &dst), &ProcessControl::new()).unwrap();
        assert_eq!(summary.linked, 1);
        assert!(dst.join("2023/06/2023-06-15_/20230615_143000.tif").is_file());
    }

    #[test]
    fn test_night_rollover_through_pipeline() {
        let (_dir, src, dst) = source_tree();
        let config = Config::default();
        let late = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 15, 0)
            .unwrap();
        let organizer = Organizer::new(&config, &dst, RealFs, FixedDecoder(Some(late)));
        let summary = organizer.run(&src, None).unwrap();

        assert_eq!(summary.linked, 4);
        assert!(dst.join("2024/03/2024-03-09_/20230615_143000.jpg").is_file());
        assert!(dst.join("2024/03/2024-03-09_/IMG_0001.JPG").is_file());
    }

    #[test]
    fn test_boundary_hour_is_configurable() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        write(&src.join("20240310_021500.jpg"), b"late");

        let config = Config::default().with_boundary_hour(0);
        let organizer = Organizer::new(&config, &dst, RealFs, FixedDecoder(None));
        organizer.run(&src, None).unwrap();
        assert!(dst.join("2024/03/2024-03-10_/20240310_021500.jpg").is_file());
    }

    #[test]
    fn test_cross_device_copies_and_continues() {
        let (_dir, src, dst) = source_tree();
        let config = Config::default();
        let link_fails = LinkFailsFs {
            kind: io::ErrorKind::CrossesDevices,
            copy_fails: false,
        };
        let organizer = Organizer::new(&config, &dst, link_fails, ExifDecoder);

        let summary = organizer.run(&src, None).unwrap();
        assert_eq!(summary.copied, 4);
        assert_eq!(
            fs::read(dst.join("2023/06/2023-06-15_/20230615_143000.jpg")).unwrap(),
            fs::read(src.join("20230615_143000.jpg")).unwrap()
        );

        let again = organizer.run(&src, None).unwrap();
        assert_eq!(again.already_up_to_date, 4);
        assert_eq!(again.files_written(), 0);
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let (_dir, src, dst) = source_tree();
        let config = Config::default();

        let organizer = Organizer::new(
            &config,
            &dst,
            LinkFailsFs {
                kind: io::ErrorKind::PermissionDenied,
                copy_fails: false,
            },
            ExifDecoder,
        );
        let summary = organizer.run(&src, None).unwrap();
        assert_eq!(summary.errors, 4);
        assert_eq!(summary.scanned, 5);

        let organizer = Organizer::new(
            &config,
            &dst,
            LinkFailsFs {
                kind: io::ErrorKind::CrossesDevices,
                copy_fails: true,
            },
            ExifDecoder,
        );
        let summary = organizer.run(&src, None).unwrap();
        assert_eq!(summary.failed, 4);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn test_unreadable_source_fails_the_run() {
        let dir = tempdir().unwrap();
        let result = organize(
            &options(&dir.path().join("missing"), &dir.path().join("dst")),
            &ProcessControl::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_fails_the_run() {
        let (_dir, src, dst) = source_tree();
        let mut opts = options(&src, &dst);
        opts.config = opts.config.with_boundary_hour(30);
        assert!(organize(&opts, &ProcessControl::new()).is_err());
    }

    #[test]
    fn test_cancellation() {
        let (_dir, src, dst) = source_tree();
        let token = CancellationToken::new();
        token.cancel();

        let err = organize(
            &options(&src, &dst),
            &ProcessControl::new().with_cancel_token(token),
        )
        .unwrap_err();
        assert!(err.downcast_ref::<CancelledError>().is_some());
        assert!(fs::read_dir(&dst).unwrap().next().is_none());
    }

    #[test]
    fn test_summary_serializes() {
        let mut summary = RunSummary::default();
        summary.record(&PlacementOutcome::Linked);
        summary.record(&PlacementOutcome::Failed("disk full".to_string()));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["linked"], 1);
        assert_eq!(json["failed"], 1);
    }
}
