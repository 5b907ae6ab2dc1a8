//! Wire messages exchanged between peers: a hand-rolled binary codec
//! (fixed-width fields, one discriminator byte), conversion from the state
//! machine's outbound events, and ECDSA signing/recovery through the
//! `Crypto` port.

pub mod codec;
pub mod convert;
pub mod error;
pub mod message;

pub use convert::{
	event_recipient,
	from_event,
};
pub use error::MessageError;
pub use message::{
	AnnounceDisposedMessage,
	BalanceProofMessage,
	MediatedTransfer,
	Message,
	RevealSecretMessage,
	SecretRequestMessage,
};

#[cfg(test)]
mod tests {
	use waypoint_primitives::{
		ports::Crypto,
		types::{
			Address,
			Signature,
		},
	};

	use super::*;

	/// A non-recovering stub: every message signs to a fixed signature and
	/// "recovers" to whatever address is embedded in the first 20 bytes of
	/// that signature. Good enough to exercise the round-trip and mismatch
	/// paths without real secp256k1 math.
	struct StubCrypto {
		address: Address,
	}

	impl Crypto for StubCrypto {
		fn sign(&self, _message: &[u8]) -> Signature {
			Signature(self.address.as_bytes().to_vec())
		}

		fn recover(&self, _message: &[u8], signature: &Signature) -> Option<Address> {
			if signature.0.len() < 20 {
				return None
			}
			Some(Address::from_slice(&signature.0[..20]))
		}

		fn address(&self) -> Address {
			self.address
		}
	}

	fn secret_request(sender: Address) -> Message {
		Message::SecretRequest(SecretRequestMessage {
			sender,
			message_identifier: 1,
			secret_hash: Default::default(),
			amount: Default::default(),
			signature: None,
		})
	}

	#[test]
	fn sign_then_verify_round_trips() {
		let crypto = StubCrypto { address: Address::from_low_u64_be(7) };
		let mut message = secret_request(crypto.address());
		message.sign(&crypto);
		assert!(message.verify(&crypto).is_ok());
	}

	#[test]
	fn verify_rejects_wrong_declared_sender() {
		let crypto = StubCrypto { address: Address::from_low_u64_be(7) };
		let mut message = secret_request(Address::from_low_u64_be(99));
		message.sign(&crypto);
		assert!(message.verify(&crypto).is_err());
	}

	#[test]
	fn encode_then_decode_round_trips() {
		let crypto = StubCrypto { address: Address::from_low_u64_be(7) };
		let mut message = secret_request(crypto.address());
		message.sign(&crypto);
		let bytes = message.encode().unwrap();
		let decoded = Message::decode(&bytes).unwrap();
		assert_eq!(decoded, message);
	}

	#[test]
	fn encode_without_signature_fails() {
		let message = secret_request(Address::from_low_u64_be(7));
		assert!(message.encode().is_err());
	}
}
