pub mod identity_voter;
pub mod position_signal;
