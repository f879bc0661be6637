// Copyright (c) 2024 The Weft Authors

//! The transaction submission pipeline.
//!
//! A submission flows: build and sign a proposal, fan it out to the
//! endorser set, collate and check the responses, wrap the endorsed
//! result in a transaction envelope, broadcast it to an orderer, and
//! wait for the commit event — with the commit tracker armed before the
//! broadcast so a block racing the ack is never lost. The [`Gateway`]
//! composes the steps; each is also usable on its own.
//!
//! Every operation takes explicit deadlines and is cancel-safe:
//! dropping a returned future cancels its outstanding dispatches.

mod discovery;
mod endorse;
mod error;
mod gateway;
mod options;
mod policy;
mod proposal;
mod submit;

pub use discovery::{discover, DiscoveredPeer, DiscoveryResult};
pub use endorse::{endorse, EndorsementOutcome, PeerEndorsement, PeerError};
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use options::{CallTimeouts, SubmitOptions};
pub use policy::{EndorsementPolicy, PolicyLayout};
pub use proposal::{build_proposal, SignedProposalBundle};
pub use submit::{broadcast, build_transaction_envelope};
