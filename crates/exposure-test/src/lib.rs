pub mod corpus;
pub mod runner;

pub use corpus::{Corpus, CorpusCase, CorpusCaseExpectation, CorpusFile, TestFile};
pub use runner::{CaseOutcome, CaseStatus, RunnerConfig, run_cases, run_cases_for_file};
