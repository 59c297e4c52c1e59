//! mootcourt: a turn-based courtroom role-play session engine.
//!
//! A human plays one side of a criminal case; a generative-text service
//! plays judge, opposing counsel and jury. The engine's job is to defend
//! session state against that service: every reference in model output is
//! checked against the docket's actual facts, evidence, jurors and rulings,
//! settled dispositions can never be overwritten, and a persistent
//! sanctions lifecycle gates what the player may do next.

pub mod disposition;
pub mod docket;
pub mod errors;
pub mod export;
pub mod jury;
pub mod logging;
pub mod model;
pub mod motion;
pub mod reference;
pub mod registry;
pub mod sanctions;
pub mod session;
pub mod storage;
pub mod verdict;

pub use disposition::{DispositionRecord, Outcome};
pub use docket::{CaseDocket, Role};
pub use errors::EngineError;
pub use sanctions::{ConductState, SanctionsEngine};
pub use session::SessionEngine;
