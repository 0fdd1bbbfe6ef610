//! Document reconciliation and ordering engine.
//!
//! Stages connected left to right:
//! ```text
//! batch → reconcile → extract (many, concurrent) → organize → sequence
//! ```
//!
//! `reconcile` discovers files and drives one extraction job per document;
//! `organize` resolves counters into canonical filenames and archives
//! superseded originals; `sequence` projects the result into the ordered,
//! cross-referenced list the external report compiler consumes.

pub mod batch;
pub mod error;
pub mod exiftool;
pub mod extract;
pub mod organize;
pub mod reconcile;
pub mod sequence;

pub use batch::{run_batch, BatchConfig, BatchSummary, PersonOutcome};
pub use error::PipelineError;
pub use exiftool::{ExifTool, MetadataTool, ToolFields, WrittenFields};
pub use extract::{spawn_extraction, ExtractionOutcome, JobContext};
pub use organize::{organize_catalog, organize_document, OrganizeReport, OrganizedDocument};
pub use reconcile::{reconcile_person, scan_category};
pub use sequence::{sequence_report, CategorySummary, ReportSequence, SequencedDocument};
