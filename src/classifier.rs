//! Frame classification.
//!
//! A [`FrameClassifier`] turns one still image into a [`ClassificationScore`].
//! The stock implementation, [`CommandClassifier`], runs an external program
//! per frame and parses the JSON record it prints:
//!
//! ```text
//! {"evaluationTime": 0.41, "credits": 0.97, "scene": 0.03}
//! ```
//!
//! [`ClassifierAdapter`] sits between the worker pool and the classifier. It
//! reduces the score to a credits flag, downgrades failures to a not-credits
//! verdict, and writes one audit line per attempt.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::audit::AuditLog;
use crate::error::ClassifierError;
use crate::frames::Frame;

/// Placeholder replaced by the frame path in classifier arguments.
pub const FRAME_PLACEHOLDER: &str = "{frame}";

/// Classifier command used when none is configured.
pub const DEFAULT_CLASSIFIER_COMMAND: &str =
    "python scripts/label_image.py --graph=tf_files/retrained_graph.pb --image={frame}";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Raw scores for one frame, as printed by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScore {
    /// Time the classifier spent on the frame, in seconds.
    #[serde(rename = "evaluationTime", default)]
    pub evaluation_time: f64,
    /// Probability that the frame shows closing credits.
    #[serde(rename = "credits", alias = "creditsProbability")]
    pub credits_probability: f64,
    /// Probability that the frame shows a regular scene.
    #[serde(rename = "scene", alias = "sceneProbability", default)]
    pub scene_probability: f64,
}

impl ClassificationScore {
    /// Parse classifier output.
    ///
    /// The whole output is tried first; if it is not a record, the last
    /// non-empty line is tried, so classifiers that print diagnostics before
    /// their result are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::MalformedOutput`] if no record can be parsed
    /// or a probability lies outside `[0, 1]`.
    pub fn parse(output: &str) -> Result<Self, ClassifierError> {
        let trimmed = output.trim();
        let score: Self = match serde_json::from_str(trimmed) {
            Ok(score) => score,
            Err(error) => {
                let last_line = trimmed.lines().rev().find(|line| !line.trim().is_empty());
                match last_line.map(|line| serde_json::from_str::<Self>(line.trim())) {
                    Some(Ok(score)) => score,
                    _ => return Err(error.into()),
                }
            }
        };
        score.validate()?;
        Ok(score)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        for (name, value) in [
            ("credits", self.credits_probability),
            ("scene", self.scene_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassifierError::MalformedOutput(format!(
                    "{name} probability {value} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Classification result for one frame after thresholding.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameVerdict {
    /// The classifier produced a score.
    Classified {
        /// Raw scores.
        score: ClassificationScore,
        /// `score.credits_probability > credits_threshold`.
        is_credits: bool,
    },
    /// The classifier failed; the frame counts as not-credits.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl FrameVerdict {
    /// The flag stored for this frame.
    pub fn is_credits(&self) -> bool {
        match self {
            FrameVerdict::Classified { is_credits, .. } => *is_credits,
            FrameVerdict::Failed { .. } => false,
        }
    }

    /// Returns `true` for [`FrameVerdict::Failed`].
    pub fn is_failure(&self) -> bool {
        matches!(self, FrameVerdict::Failed { .. })
    }
}

/// Turns a frame image into scores.
///
/// Implementations must be [`Send`] and [`Sync`]: one classifier instance is
/// shared by every worker of a batch.
pub trait FrameClassifier: Send + Sync {
    /// Classify the image at `frame`.
    fn classify(&self, frame: &Path) -> Result<ClassificationScore, ClassifierError>;
}

/// Runs an external program once per frame.
///
/// Arguments containing [`FRAME_PLACEHOLDER`] have it replaced by the frame
/// path. If no argument contains it, the path is appended as the last
/// argument.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandClassifier {
    /// Create a classifier that runs `program` with no arguments.
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Build a classifier from a whitespace-separated command line.
    ///
    /// Returns `None` for an empty command line. No shell quoting is
    /// interpreted.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program).args(words))
    }

    /// Append one argument.
    #[must_use]
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the classifier if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program that is executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one frame, with the placeholder resolved.
    pub fn resolved_args(&self, frame: &Path) -> Vec<String> {
        let frame = frame.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(FRAME_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(FRAME_PLACEHOLDER, &frame)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(frame.into_owned());
        }
        args
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ClassifierError> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(error) = child.kill() {
                    log::warn!("Failed to kill timed out classifier: {error}");
                }
                let _ = child.wait();
                return Err(ClassifierError::TimedOut(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for CommandClassifier {
    fn default() -> Self {
        Self::from_command_line(DEFAULT_CLASSIFIER_COMMAND)
            .unwrap_or_else(|| Self::new("python"))
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

impl FrameClassifier for CommandClassifier {
    fn classify(&self, frame: &Path) -> Result<ClassificationScore, ClassifierError> {
        let args = self.resolved_args(frame);
        log::debug!("Running classifier: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| ClassifierError::Launch {
                program: self.program.clone(),
                reason: error.to_string(),
            })?;

        // Drain both pipes while waiting so a chatty classifier cannot block
        // on a full pipe. On timeout the readers are left to finish on their
        // own.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(ClassifierError::Failed {
                status,
                stderr: stderr.trim().to_string(),
            });
        }

        ClassificationScore::parse(&stdout)
    }
}

/// Applies the credits threshold to classifier output and audits every
/// attempt.
pub struct ClassifierAdapter {
    classifier: Arc<dyn FrameClassifier>,
    credits_threshold: f64,
    audit: AuditLog,
}

impl ClassifierAdapter {
    /// Wrap `classifier`, flagging frames whose credits probability exceeds
    /// `credits_threshold`.
    pub fn new(
        classifier: Arc<dyn FrameClassifier>,
        credits_threshold: f64,
        audit: AuditLog,
    ) -> Self {
        Self {
            classifier,
            credits_threshold,
            audit,
        }
    }

    /// The audit log this adapter writes to.
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Classify one frame. Never fails: classifier errors become
    /// [`FrameVerdict::Failed`].
    pub fn classify(&self, frame: &Frame) -> FrameVerdict {
        log::debug!("Analysing frame {}", frame.path.display());

        let verdict = match self.classifier.classify(&frame.path) {
            Ok(score) => FrameVerdict::Classified {
                is_credits: score.credits_probability > self.credits_threshold,
                score,
            },
            Err(error) => {
                log::warn!("Analysing frame {} failed: {error}", frame.path.display());
                FrameVerdict::Failed {
                    reason: error.to_string(),
                }
            }
        };

        self.audit.append(frame, &verdict);
        verdict
    }
}
