use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, covering every failure this library can report.
///
/// Scheduling is an internal compiler pass, so there are only two broad
/// classes of failure. Input that does not fit the machine model (an operand
/// naming a register outside the register files or the size table) is
/// reported as [`Error::Malformed`] before any graph is built. Everything
/// else is a broken invariant inside the pass itself: a cyclic dependency
/// graph, a blocking count dropping below zero, or nodes left unscheduled when
/// the ready list runs dry. Those abort the block; the caller is expected to
/// fail compilation rather than emit a possibly-incorrect instruction order.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Operand or instruction outside the machine model
/// - [`Error::InvalidConfig`] - Scheduler configuration failed validation
///
/// ## Invariant Violations
/// - [`Error::GraphError`] - Cycle or blocking-count underflow in the DAG
/// - [`Error::SchedulingStalled`] - Ready list emptied with nodes remaining
///
/// # Examples
///
/// ```rust
/// use gensched::Error;
///
/// fn report(err: &Error) -> &'static str {
///     match err {
///         Error::Malformed { .. } | Error::InvalidConfig(_) => "bad input",
///         Error::GraphError(_) | Error::SchedulingStalled { .. } => "scheduler bug",
///     }
/// }
///
/// let err = Error::SchedulingStalled { scheduled: 3, total: 5 };
/// assert_eq!(report(&err), "scheduler bug");
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The instruction stream does not fit the machine model.
    ///
    /// Raised while building the dependency graph, e.g. for a virtual
    /// register missing from the size table, a message register beyond the
    /// message file, or a virtual register appearing after allocation. The
    /// error includes the source location where it was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the offending operand or instruction
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The scheduler configuration is inconsistent.
    ///
    /// Returned by [`SchedulerConfig::validate`](crate::schedule::SchedulerConfig::validate)
    /// and by every entry point that validates its configuration first.
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// Dependency graph invariant violated.
    ///
    /// Raised when the graph contains a cycle, when an edge would point
    /// backwards in program order, or when a node's blocking count would
    /// underflow while draining the ready list.
    #[error("{0}")]
    GraphError(String),

    /// The ready list emptied while some nodes were never scheduled.
    ///
    /// This only happens if the dependency graph is not a DAG; the partial
    /// order is discarded.
    #[error("Scheduling stalled after {scheduled} of {total} instructions")]
    SchedulingStalled {
        /// Number of instructions emitted before the stall
        scheduled: usize,
        /// Number of instructions in the block
        total: usize,
    },
}
