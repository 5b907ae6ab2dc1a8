//! The generic kernel: `apply(state, change) -> (state', events)`.
//!
//! Dispatch over `(current role, state-change kind)` is a closed case
//! analysis rather than open dynamic dispatch: every combination is listed
//! explicitly below, and a change that does not apply to the current role
//! is a no-op rather than an error, since it is always legal for a stale or
//! misrouted message to arrive after an instance has moved on.

pub mod initiator;
pub mod mediator;
pub mod routes;
pub mod target;

use waypoint_primitives::types::BlockNumber;

use crate::{
	errors::StateTransitionError,
	types::{
		ChannelMap,
		Event,
		PaymentState,
		Random,
		StateChange,
	},
};

pub fn apply(
	state: Option<PaymentState>,
	state_change: StateChange,
	channels: &mut ChannelMap,
	block_number: BlockNumber,
	rng: &mut Random,
) -> Result<(Option<PaymentState>, Vec<Event>), StateTransitionError> {
	match state {
		None => match state_change {
			StateChange::ActionInitInitiator(action) => {
				let (next, events) = initiator::init(action, channels, block_number, rng)?;
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::ActionInitMediator(action) => {
				let (next, events) = mediator::init(action, channels, block_number, rng)?;
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ActionInitTarget(action) => {
				let (next, events) = target::init(action, channels, block_number, rng)?;
				Ok((next.map(PaymentState::Target), events))
			},
			// No live instance and no init change: nothing to do. Covers stale
			// retransmits arriving after a payment already terminated.
			StateChange::ActionCancelRoute(_) |
			StateChange::ReceiveSecretRequest(_) |
			StateChange::ReceiveSecretReveal(_) |
			StateChange::ReceiveTransferRefund(_) |
			StateChange::ReceiveBalanceProof(_) |
			StateChange::ContractSecretReveal(_) |
			StateChange::BlockStateChange(_) => Ok((None, vec![])),
		},

		Some(PaymentState::Initiator(s)) => match state_change {
			StateChange::ReceiveSecretRequest(req) => {
				let (next, events) = initiator::handle_secret_request(s, req);
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::ReceiveSecretReveal(reveal) => {
				let (next, events) = initiator::handle_secret_reveal(s, reveal, channels)?;
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::ContractSecretReveal(reveal) => {
				let (next, events) = initiator::handle_contract_secret_reveal(s, reveal, channels)?;
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::ReceiveTransferRefund(refund) => {
				let (next, events) = initiator::handle_refund(s, refund, channels, block_number, rng)?;
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::ReceiveBalanceProof(proof) => {
				let (next, events) = initiator::handle_balance_proof(s, proof);
				Ok((next.map(PaymentState::Initiator), events))
			},
			StateChange::BlockStateChange(block) => {
				let (next, events) = initiator::handle_block(s, block.block_number, channels, rng)?;
				Ok((next.map(PaymentState::Initiator), events))
			},
			// An initiator instance doesn't react to these; a misrouted or
			// stale message arriving after the role is settled is a no-op.
			StateChange::ActionInitInitiator(_) |
			StateChange::ActionInitMediator(_) |
			StateChange::ActionInitTarget(_) |
			StateChange::ActionCancelRoute(_) => Ok((Some(PaymentState::Initiator(s)), vec![])),
		},

		Some(PaymentState::Mediator(s)) => match state_change {
			StateChange::ActionCancelRoute(cancel) => {
				let (next, events) = mediator::handle_cancel_route(s, cancel);
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ReceiveSecretReveal(reveal) => {
				let (next, events) = mediator::handle_secret_reveal(s, reveal);
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ContractSecretReveal(reveal) => {
				let (next, events) = mediator::handle_contract_secret_reveal(s, reveal);
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ReceiveBalanceProof(proof) => {
				let (next, events) = mediator::handle_balance_proof(s, proof, channels)?;
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ReceiveTransferRefund(refund) => {
				let (next, events) = mediator::handle_refund(s, refund, channels, block_number, rng)?;
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::BlockStateChange(block) => {
				let (next, events) = mediator::handle_block(s, block.block_number, channels);
				Ok((next.map(PaymentState::Mediator), events))
			},
			StateChange::ActionInitInitiator(_) |
			StateChange::ActionInitMediator(_) |
			StateChange::ActionInitTarget(_) |
			StateChange::ReceiveSecretRequest(_) => Ok((Some(PaymentState::Mediator(s)), vec![])),
		},

		Some(PaymentState::Target(s)) => match state_change {
			StateChange::ReceiveSecretReveal(reveal) => {
				let (next, events) = target::handle_secret_reveal(s, reveal);
				Ok((next.map(PaymentState::Target), events))
			},
			StateChange::ReceiveBalanceProof(proof) => {
				let (next, events) = target::handle_balance_proof(s, proof);
				Ok((next.map(PaymentState::Target), events))
			},
			StateChange::BlockStateChange(block) => {
				let (next, events) = target::handle_block(s, block.block_number, channels)?;
				Ok((next.map(PaymentState::Target), events))
			},
			StateChange::ActionInitInitiator(_) |
			StateChange::ActionInitMediator(_) |
			StateChange::ActionInitTarget(_) |
			StateChange::ActionCancelRoute(_) |
			StateChange::ReceiveSecretRequest(_) |
			StateChange::ReceiveTransferRefund(_) |
			StateChange::ContractSecretReveal(_) => Ok((Some(PaymentState::Target(s)), vec![])),
		},
	}
}
