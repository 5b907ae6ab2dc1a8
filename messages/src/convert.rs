//! Turns outbound `Event`s into unsigned wire messages. Signing happens
//! afterwards, once the caller has a `Crypto` port to sign with.

use waypoint_primitives::types::Address;
use waypoint_state_machine::types::Event;

use crate::message::{
	AnnounceDisposedMessage,
	BalanceProofMessage,
	MediatedTransfer,
	Message,
	RevealSecretMessage,
	SecretRequestMessage,
};

/// Builds the unsigned wire message for `event`, if it is one of the
/// variants that corresponds to a peer-to-peer message. Contract sends and
/// observational events have no wire form and return `None`.
pub fn from_event(event: &Event, our_address: Address) -> Option<Message> {
	let message = match event {
		Event::SendLockedTransfer(e) => Message::MediatedTransfer(MediatedTransfer {
			sender: our_address,
			message_identifier: e.message_identifier,
			payment_identifier: e.transfer.payment_identifier,
			nonce: e.balance_proof.nonce,
			token: e.transfer.token,
			channel_identifier: e.canonical_identifier.channel_identifier,
			transferred_amount: e.balance_proof.transferred_amount,
			locked_amount: e.balance_proof.locked_amount,
			recipient: e.recipient,
			locksroot: e.balance_proof.locksroot,
			lock: waypoint_primitives::types::HashTimeLock {
				amount: e.transfer.amount,
				expiration: e.transfer.expiration,
				secret_hash: e.transfer.secret_hash,
			},
			target: e.transfer.target,
			initiator: e.transfer.initiator,
			fee: waypoint_primitives::types::TokenAmount::zero(),
			signature: None,
		}),
		Event::SendSecretRequest(e) => Message::SecretRequest(SecretRequestMessage {
			sender: our_address,
			message_identifier: e.message_identifier,
			secret_hash: e.secret_hash,
			amount: e.amount,
			signature: None,
		}),
		Event::SendSecretReveal(e) => Message::RevealSecret(RevealSecretMessage {
			sender: our_address,
			message_identifier: e.message_identifier,
			secret: e.secret.clone(),
			signature: None,
		}),
		Event::SendBalanceProof(e) => Message::BalanceProof(BalanceProofMessage {
			sender: our_address,
			message_identifier: e.message_identifier,
			nonce: e.balance_proof.nonce,
			channel_identifier: e.canonical_identifier.channel_identifier,
			transferred_amount: e.balance_proof.transferred_amount,
			locksroot: e.balance_proof.locksroot,
			secret_hash: e.secret_hash,
			signature: None,
		}),
		Event::SendAnnounceDisposed(e) => Message::AnnounceDisposed(AnnounceDisposedMessage {
			sender: our_address,
			message_identifier: e.message_identifier,
			secret_hash: e.secret_hash,
			transfer: e.transfer.clone(),
			signature: None,
		}),
		Event::ContractSendChannelClose(_) |
		Event::ContractSendWithdraw(_) |
		Event::ContractSendSecretReveal(_) |
		Event::EventTransferFailed(_) |
		Event::EventPaymentSentSuccess(_) |
		Event::EventTransferReceivedSuccess(_) |
		Event::EventWithdrawSuccess(_) |
		Event::EventWithdrawFailed(_) |
		Event::ErrorByzantineBehavior(_) => return None,
	};
	Some(message)
}

/// The peer a wire-forming event's message should be sent to, if any.
/// Mirrors the match arms of [`from_event`] — always `Some` for the same
/// variants that produce a message there.
pub fn event_recipient(event: &Event) -> Option<Address> {
	match event {
		Event::SendLockedTransfer(e) => Some(e.recipient),
		Event::SendSecretRequest(e) => Some(e.recipient),
		Event::SendSecretReveal(e) => Some(e.recipient),
		Event::SendBalanceProof(e) => Some(e.recipient),
		Event::SendAnnounceDisposed(e) => Some(e.recipient),
		_ => None,
	}
}
