//! Data models for neurotempo-server
//!
//! Everything here lives only for the duration of a request or in process
//! memory; nothing is persisted.

pub mod mental_state;
pub mod recommendation;
pub mod session;
pub mod stress;
pub mod wave;

pub use mental_state::{AnalysisResult, MentalState, MentalStateKind};
pub use recommendation::{Bpm, Recommendation, Song};
pub use session::{Session, SessionSnapshot, SessionState};
pub use stress::{StressAssessment, StressLevel, StressType};
pub use wave::{Band, BandPowers, WaveSummary};
