//! Stage contract and the pull-driven pipeline runner.
//!
//! A pipeline is a source stream followed by an ordered chain of stages. The
//! consumer pulls files from the last stage; a stage is fed only when its
//! outbox is empty, so the source is never read faster than the slowest
//! stage drains. Stages that emit a batch (see [`Outbox::push_all`]) park
//! whatever exceeds [`HIGH_WATER_MARK`] until the consumer catches up.

mod outbox;

pub use outbox::{HIGH_WATER_MARK, Outbox};

use std::fmt;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::file::FileRecord;
use crate::glob::FileStream;
use crate::logging::Log;

/// One transformation step of a pipeline.
pub trait Stage: Send + fmt::Debug {
    /// Short label used in log messages (`FILTER`, `MOVE`, ...).
    fn label(&self) -> &'static str;

    /// Handle one incoming file, emitting zero or more files into `out`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::File`] drops the file and keeps the pipeline running;
    /// any other error stops the pipeline.
    fn transform(&mut self, file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError>;

    /// Called once after the last incoming file.
    ///
    /// # Errors
    ///
    /// Any error stops the pipeline; files still buffered are lost.
    fn flush(&mut self, _out: &mut Outbox) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Debug)]
struct Slot {
    stage: Box<dyn Stage>,
    outbox: Outbox,
    finished: bool,
}

/// An assembled pipeline for one (export, package) pair.
///
/// Iterating yields the files that reach the end of the chain, in order.
pub struct Pipeline {
    export: String,
    package: String,
    source: FileStream,
    slots: Vec<Slot>,
    log: Arc<dyn Log>,
    stopped: bool,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("export", &self.export)
            .field("package", &self.package)
            .field("slots", &self.slots)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline for `package` of `export`, reading `source` through `stages`
    /// in order.
    #[must_use]
    pub fn new(
        export: &str,
        package: &str,
        source: FileStream,
        stages: Vec<Box<dyn Stage>>,
        log: Arc<dyn Log>,
    ) -> Self {
        Self {
            export: export.to_string(),
            package: package.to_string(),
            source,
            slots: stages
                .into_iter()
                .map(|stage| Slot {
                    stage,
                    outbox: Outbox::new(),
                    finished: false,
                })
                .collect(),
            log,
            stopped: false,
        }
    }

    /// Name of the export the pipeline belongs to.
    #[must_use]
    pub fn export(&self) -> &str {
        &self.export
    }

    /// Package the pipeline reads from.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Pipeline name (`<export> - <package>`).
    #[must_use]
    pub fn name(&self) -> String {
        format!("{} - {}", self.export, self.package)
    }

    /// Whether a stage stopped the pipeline before its input was exhausted.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn next_source(&mut self) -> Option<FileRecord> {
        loop {
            match self.source.next()? {
                Ok(file) => return Some(file),
                Err(e) => self.log.error(&format!(
                    "Failed to read source entry (pipeline: '{}', reason: '{e:#}')",
                    self.name()
                )),
            }
        }
    }

    /// Next file leaving the first `depth` stages (`0` is the source itself).
    fn pull(&mut self, depth: usize) -> Option<FileRecord> {
        let Some(index) = depth.checked_sub(1) else {
            return self.next_source();
        };
        loop {
            let slot = self.slots.get_mut(index)?;
            if let Some(file) = slot.outbox.pop() {
                return Some(file);
            }
            if slot.finished || self.stopped {
                return None;
            }

            let upstream = self.pull(index);
            if self.stopped {
                return None;
            }
            let slot = self.slots.get_mut(index)?;
            let result = match upstream {
                Some(file) => {
                    let path = file.relative().to_string();
                    slot.stage
                        .transform(file, &mut slot.outbox)
                        .map_err(|e| (Some(path), e))
                }
                None => {
                    slot.finished = true;
                    slot.stage.flush(&mut slot.outbox).map_err(|e| (None, e))
                }
            };
            if let Err((path, e)) = result {
                self.handle_error(index, path.as_deref(), &e);
            }
        }
    }

    fn handle_error(&mut self, index: usize, path: Option<&str>, error: &PipelineError) {
        let label = self.slots.get(index).map_or("?", |slot| slot.stage.label());
        match error {
            PipelineError::File { .. } => {
                self.log
                    .error(&format!("{error} (pipeline: '{} - {label}')", self.name()));
            }
            _ => {
                self.stopped = true;
                self.log.error(&format!(
                    "{error} (pipeline: '{} - {label}', file: '{}')",
                    self.name(),
                    path.unwrap_or_default()
                ));
            }
        }
    }
}

impl Iterator for Pipeline {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        if self.stopped {
            return None;
        }
        let depth = self.slots.len();
        self.pull(depth)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, isolated_logger};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn files(names: &[&str]) -> FileStream {
        let records: Vec<_> = names
            .iter()
            .map(|n| Ok(FileRecord::new("/pkg", n, false)))
            .collect();
        Box::new(records.into_iter())
    }

    /// Drops files whose name contains `skip`.
    #[derive(Debug)]
    struct Skip(&'static str);

    impl Stage for Skip {
        fn label(&self) -> &'static str {
            "SKIP"
        }

        fn transform(&mut self, file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
            if !file.relative().contains(self.0) {
                out.push(file);
            }
            Ok(())
        }
    }

    /// Holds everything back until flush.
    #[derive(Debug, Default)]
    struct Hold(Vec<FileRecord>);

    impl Stage for Hold {
        fn label(&self) -> &'static str {
            "HOLD"
        }

        fn transform(&mut self, file: FileRecord, _out: &mut Outbox) -> Result<(), PipelineError> {
            self.0.push(file);
            Ok(())
        }

        fn flush(&mut self, out: &mut Outbox) -> Result<(), PipelineError> {
            out.push_all(self.0.drain(..));
            Ok(())
        }
    }

    /// Fails on files named `bad*`, aborting on `fatal*`.
    #[derive(Debug)]
    struct Picky;

    impl Stage for Picky {
        fn label(&self) -> &'static str {
            "PICKY"
        }

        fn transform(&mut self, file: FileRecord, out: &mut Outbox) -> Result<(), PipelineError> {
            if file.relative().starts_with("bad") {
                return Err(PipelineError::File {
                    path: file.relative().to_string(),
                    reason: "bad file".to_string(),
                });
            }
            if file.relative().starts_with("fatal") {
                return Err(PipelineError::Aborted {
                    pipeline: "p".to_string(),
                    reason: "fatal file".to_string(),
                });
            }
            out.push(file);
            Ok(())
        }
    }

    fn names(pipeline: Pipeline) -> Vec<String> {
        pipeline.map(|f| f.relative().to_string()).collect()
    }

    #[test]
    fn stages_run_in_order() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let pipeline = Pipeline::new(
            "e",
            "p",
            files(&["a.js", "b.ts", "c.js"]),
            vec![Box::new(Skip("b")), Box::new(Hold::default())],
            Arc::new(log),
        );
        assert_eq!(names(pipeline), ["a.js", "c.js"]);
    }

    #[test]
    fn empty_chain_yields_the_source() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let pipeline = Pipeline::new("e", "p", files(&["a", "b"]), vec![], Arc::new(log));
        assert_eq!(names(pipeline), ["a", "b"]);
    }

    #[test]
    fn file_errors_drop_only_that_file() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let pipeline = Pipeline::new(
            "e",
            "p",
            files(&["a", "bad", "c"]),
            vec![Box::new(Picky)],
            Arc::new(log),
        );
        assert_eq!(names(pipeline), ["a", "c"]);
    }

    #[test]
    fn aborts_stop_the_pipeline() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let mut pipeline = Pipeline::new(
            "e",
            "p",
            files(&["a", "fatal", "c"]),
            vec![Box::new(Picky)],
            Arc::new(log),
        );
        assert_eq!(pipeline.next().unwrap().relative(), "a");
        assert!(pipeline.next().is_none());
        assert!(pipeline.is_stopped());
        assert!(pipeline.next().is_none());
    }

    #[test]
    fn source_errors_are_skipped() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let source: FileStream = Box::new(
            vec![
                Ok(FileRecord::new("/pkg", "a", false)),
                Err(anyhow::anyhow!("permission denied")),
                Ok(FileRecord::new("/pkg", "b", false)),
            ]
            .into_iter(),
        );
        let pipeline = Pipeline::new("e", "p", source, vec![], Arc::new(log));
        assert_eq!(names(pipeline), ["a", "b"]);
    }

    #[test]
    fn source_is_read_lazily() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let source: FileStream = Box::new((0..1000).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FileRecord::new("/pkg", &format!("f{i}"), false))
        }));
        let mut pipeline = Pipeline::new("e", "p", source, vec![Box::new(Skip("x"))], Arc::new(log));
        pipeline.next();
        pipeline.next();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn large_flush_is_delivered_completely_and_in_order() {
        let (log, _dir, _guard) = isolated_logger(LogLevel::Debug);
        let names_in: Vec<String> = (0..200).map(|i| format!("f{i:03}")).collect();
        let refs: Vec<&str> = names_in.iter().map(String::as_str).collect();
        let pipeline = Pipeline::new(
            "e",
            "p",
            files(&refs),
            vec![Box::new(Hold::default()), Box::new(Skip("never"))],
            Arc::new(log),
        );
        assert_eq!(names(pipeline), names_in);
    }
}
