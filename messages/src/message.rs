use waypoint_primitives::{
	constants::MAX_MESSAGE_SIZE,
	hashing::keccak256,
	ports::Crypto,
	types::{
		Address,
		ChannelIdentifier,
		HashTimeLock,
		LockedAmount,
		Locksroot,
		MessageIdentifier,
		Nonce,
		PaymentIdentifier,
		Secret,
		SecretHash,
		Signature,
		TokenAddress,
		TokenAmount,
	},
};
use waypoint_state_machine::types::{
	CanonicalIdentifier,
	LockedTransferState,
};

use crate::{
	codec::{
		Reader,
		Writer,
	},
	error::MessageError,
};

const DISCRIMINATOR_MEDIATED_TRANSFER: u8 = 0x01;
const DISCRIMINATOR_SECRET_REQUEST: u8 = 0x02;
const DISCRIMINATOR_REVEAL_SECRET: u8 = 0x03;
const DISCRIMINATOR_BALANCE_PROOF: u8 = 0x04;
const DISCRIMINATOR_ANNOUNCE_DISPOSED: u8 = 0x05;

/// Routes value forward to `recipient`, locking `lock` on
/// `channel_identifier`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediatedTransfer {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
	pub payment_identifier: PaymentIdentifier,
	pub nonce: Nonce,
	pub token: TokenAddress,
	pub channel_identifier: ChannelIdentifier,
	pub transferred_amount: TokenAmount,
	pub locked_amount: LockedAmount,
	pub recipient: Address,
	pub locksroot: Locksroot,
	pub lock: HashTimeLock,
	pub target: Address,
	pub initiator: Address,
	pub fee: TokenAmount,
	pub signature: Option<Signature>,
}

/// Asks `recipient` (the initiator) for the secret behind `secret_hash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretRequestMessage {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
	pub secret_hash: SecretHash,
	pub amount: TokenAmount,
	pub signature: Option<Signature>,
}

/// Reveals `secret` to `recipient`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealSecretMessage {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
	pub secret: Secret,
	pub signature: Option<Signature>,
}

/// Closes the off-chain obligation for `secret_hash` on `channel_identifier`
/// (historically named `Secret` in the legacy wire format).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceProofMessage {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
	pub nonce: Nonce,
	pub channel_identifier: ChannelIdentifier,
	pub transferred_amount: TokenAmount,
	pub locksroot: Locksroot,
	pub secret_hash: SecretHash,
	pub signature: Option<Signature>,
}

/// Refuses a forwarded route, returning the full locked transfer back to
/// the sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceDisposedMessage {
	pub sender: Address,
	pub message_identifier: MessageIdentifier,
	pub secret_hash: SecretHash,
	pub transfer: LockedTransferState,
	pub signature: Option<Signature>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
	MediatedTransfer(MediatedTransfer),
	SecretRequest(SecretRequestMessage),
	RevealSecret(RevealSecretMessage),
	BalanceProof(BalanceProofMessage),
	AnnounceDisposed(AnnounceDisposedMessage),
}

impl Message {
	/// The declared sender, used to verify the recovered signer matches.
	pub fn sender(&self) -> Address {
		match self {
			Message::MediatedTransfer(m) => m.sender,
			Message::SecretRequest(m) => m.sender,
			Message::RevealSecret(m) => m.sender,
			Message::BalanceProof(m) => m.sender,
			Message::AnnounceDisposed(m) => m.sender,
		}
	}

	fn signature(&self) -> Option<&Signature> {
		match self {
			Message::MediatedTransfer(m) => m.signature.as_ref(),
			Message::SecretRequest(m) => m.signature.as_ref(),
			Message::RevealSecret(m) => m.signature.as_ref(),
			Message::BalanceProof(m) => m.signature.as_ref(),
			Message::AnnounceDisposed(m) => m.signature.as_ref(),
		}
	}

	/// The bytes that get signed: the discriminator plus every field except
	/// the signature itself.
	fn signing_bytes(&self) -> Vec<u8> {
		let mut w = Writer::new();
		match self {
			Message::MediatedTransfer(m) => {
				w.u8(DISCRIMINATOR_MEDIATED_TRANSFER);
				w.address(m.sender);
				w.u64(m.message_identifier);
				w.u64(m.payment_identifier);
				w.u256(m.nonce);
				w.address(m.token);
				w.u256(m.channel_identifier);
				w.u256(m.transferred_amount);
				w.u256(m.locked_amount);
				w.address(m.recipient);
				w.h256(m.locksroot);
				w.u64(m.lock.expiration);
				w.u256(m.lock.amount);
				w.h256(m.lock.secret_hash);
				w.address(m.target);
				w.address(m.initiator);
				w.u256(m.fee);
			},
			Message::SecretRequest(m) => {
				w.u8(DISCRIMINATOR_SECRET_REQUEST);
				w.address(m.sender);
				w.u64(m.message_identifier);
				w.h256(m.secret_hash);
				w.u256(m.amount);
			},
			Message::RevealSecret(m) => {
				w.u8(DISCRIMINATOR_REVEAL_SECRET);
				w.address(m.sender);
				w.u64(m.message_identifier);
				w.bytes(&m.secret);
			},
			Message::BalanceProof(m) => {
				w.u8(DISCRIMINATOR_BALANCE_PROOF);
				w.address(m.sender);
				w.u64(m.message_identifier);
				w.u256(m.nonce);
				w.u256(m.channel_identifier);
				w.u256(m.transferred_amount);
				w.h256(m.locksroot);
				w.h256(m.secret_hash);
			},
			Message::AnnounceDisposed(m) => {
				w.u8(DISCRIMINATOR_ANNOUNCE_DISPOSED);
				w.address(m.sender);
				w.u64(m.message_identifier);
				w.h256(m.secret_hash);
				w.u64(m.transfer.payment_identifier);
				w.u64(m.transfer.message_identifier);
				w.u256(m.transfer.amount);
				w.u64(m.transfer.expiration);
				w.h256(m.transfer.secret_hash);
				w.address(m.transfer.token);
				w.address(m.transfer.initiator);
				w.address(m.transfer.target);
				w.u256(m.transfer.canonical_identifier.channel_identifier);
			},
		}
		w.into_vec()
	}

	/// Sign with `crypto`, attaching the resulting signature to the message.
	pub fn sign<C: Crypto>(&mut self, crypto: &C) {
		let hash = keccak256(&self.signing_bytes());
		let signature = crypto.sign(&hash);
		match self {
			Message::MediatedTransfer(m) => m.signature = Some(signature),
			Message::SecretRequest(m) => m.signature = Some(signature),
			Message::RevealSecret(m) => m.signature = Some(signature),
			Message::BalanceProof(m) => m.signature = Some(signature),
			Message::AnnounceDisposed(m) => m.signature = Some(signature),
		}
	}

	/// Verify the attached signature recovers to the declared `sender`.
	pub fn verify<C: Crypto>(&self, crypto: &C) -> Result<(), MessageError> {
		let signature = self.signature().ok_or(MessageError::Unsigned)?;
		let hash = keccak256(&self.signing_bytes());
		let recovered = match crypto.recover(&hash, signature) {
			Some(address) => address,
			None => return Err(MessageError::SignerMismatch { recovered: Address::zero(), declared: self.sender() }),
		};
		if recovered != self.sender() {
			return Err(MessageError::SignerMismatch { recovered, declared: self.sender() })
		}
		Ok(())
	}

	pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
		let mut bytes = self.signing_bytes();
		let signature = self.signature().ok_or(MessageError::Unsigned)?;
		bytes.extend_from_slice(&signature.0);
		if bytes.len() > MAX_MESSAGE_SIZE {
			return Err(MessageError::TooLarge(bytes.len(), MAX_MESSAGE_SIZE))
		}
		Ok(bytes)
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, MessageError> {
		if bytes.len() > MAX_MESSAGE_SIZE {
			return Err(MessageError::TooLarge(bytes.len(), MAX_MESSAGE_SIZE))
		}
		let mut r = Reader::new(bytes);
		let discriminator = r.u8("discriminator")?;
		let message = match discriminator {
			DISCRIMINATOR_MEDIATED_TRANSFER => Message::MediatedTransfer(MediatedTransfer {
				sender: r.address("sender")?,
				message_identifier: r.u64("message_identifier")?,
				payment_identifier: r.u64("payment_identifier")?,
				nonce: r.u256("nonce")?,
				token: r.address("token")?,
				channel_identifier: r.u256("channel_identifier")?,
				transferred_amount: r.u256("transferred_amount")?,
				locked_amount: r.u256("locked_amount")?,
				recipient: r.address("recipient")?,
				locksroot: r.h256("locksroot")?,
				lock: HashTimeLock {
					expiration: r.u64("lock.expiration")?,
					amount: r.u256("lock.amount")?,
					secret_hash: r.h256("lock.secret_hash")?,
				},
				target: r.address("target")?,
				initiator: r.address("initiator")?,
				fee: r.u256("fee")?,
				signature: Some(Signature(r.remaining().to_vec())),
			}),
			DISCRIMINATOR_SECRET_REQUEST => Message::SecretRequest(SecretRequestMessage {
				sender: r.address("sender")?,
				message_identifier: r.u64("message_identifier")?,
				secret_hash: r.h256("secret_hash")?,
				amount: r.u256("amount")?,
				signature: Some(Signature(r.remaining().to_vec())),
			}),
			DISCRIMINATOR_REVEAL_SECRET => Message::RevealSecret(RevealSecretMessage {
				sender: r.address("sender")?,
				message_identifier: r.u64("message_identifier")?,
				secret: r.bytes("secret")?,
				signature: Some(Signature(r.remaining().to_vec())),
			}),
			DISCRIMINATOR_BALANCE_PROOF => Message::BalanceProof(BalanceProofMessage {
				sender: r.address("sender")?,
				message_identifier: r.u64("message_identifier")?,
				nonce: r.u256("nonce")?,
				channel_identifier: r.u256("channel_identifier")?,
				transferred_amount: r.u256("transferred_amount")?,
				locksroot: r.h256("locksroot")?,
				secret_hash: r.h256("secret_hash")?,
				signature: Some(Signature(r.remaining().to_vec())),
			}),
			DISCRIMINATOR_ANNOUNCE_DISPOSED => {
				let sender = r.address("sender")?;
				let message_identifier = r.u64("message_identifier")?;
				let secret_hash = r.h256("secret_hash")?;
				let payment_identifier = r.u64("transfer.payment_identifier")?;
				let transfer_message_identifier = r.u64("transfer.message_identifier")?;
				let amount = r.u256("transfer.amount")?;
				let expiration = r.u64("transfer.expiration")?;
				let transfer_secret_hash = r.h256("transfer.secret_hash")?;
				let token = r.address("transfer.token")?;
				let initiator = r.address("transfer.initiator")?;
				let target = r.address("transfer.target")?;
				let channel_identifier = r.u256("transfer.channel_identifier")?;
				Message::AnnounceDisposed(AnnounceDisposedMessage {
					sender,
					message_identifier,
					secret_hash,
					transfer: LockedTransferState {
						payment_identifier,
						message_identifier: transfer_message_identifier,
						amount,
						expiration,
						secret_hash: transfer_secret_hash,
						secret: None,
						token,
						initiator,
						target,
						canonical_identifier: CanonicalIdentifier {
							chain_id: 0,
							token_address: token,
							channel_identifier,
						},
					},
					signature: Some(Signature(r.remaining().to_vec())),
				})
			},
			other => return Err(MessageError::UnknownDiscriminator(other)),
		};
		Ok(message)
	}
}
